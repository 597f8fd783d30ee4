//! Transient 1-D heat conduction for one heat-treatment phase.
//!
//! Provides:
//! - `ThermalSolver`: finite-volume θ-scheme with Picard iteration on
//!   temperature-dependent properties and linearised radiation
//! - `BoundaryModel` trait consumed uniformly for every phase kind
//! - `TemperatureHistory` with recorded fields and per-step probe series

pub mod boundary;
pub mod error;
pub mod history;
pub mod settings;
pub mod solver;
pub mod tridiag;

pub use boundary::{BoundaryModel, ConvectiveBoundary, Radiation, SurfaceExchange};
pub use error::{SolverError, SolverResult};
pub use history::TemperatureHistory;
pub use settings::SolverSettings;
pub use solver::{PhaseControl, StepDecision, StepView, ThermalSolver};
