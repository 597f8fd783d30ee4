//! Solid-state phase transformation on cooling paths.
//!
//! Provides:
//! - JMAK isothermal kinetics with Gaussian, Arrhenius or polynomial rate laws
//! - Scheil additivity for continuous cooling (`predict`)
//! - Koistinen–Marburger martensite
//! - hardness and mechanical property estimates, Hollomon–Jaffe tempering
//! - `predict_profile` over the probe locations of a part

pub mod additivity;
pub mod composition;
pub mod error;
pub mod hardness;
pub mod jmak;
pub mod params;
pub mod profile;

pub use additivity::{
    CoolingHistory, Phase, PhaseFractionResult, PhaseFractions, TransformationStart, predict,
};
pub use composition::{Composition, CriticalTemperatures};
pub use error::{KineticsError, KineticsResult};
pub use hardness::{HardnessEstimate, PhaseHardness, TemperedHardness, Toughness};
pub use jmak::{JmakParameters, RateModel};
pub use params::{MartensiteParameters, TransformationParameters};
pub use profile::{LocationPrediction, predict_profile};
