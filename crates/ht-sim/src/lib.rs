//! Multi-stage heat-treatment cycles.
//!
//! Provides:
//! - `MultiPhaseOrchestrator`: heating, transfer, quenching and tempering run
//!   back to back on one mesh, each stage starting from the previous field
//! - Stage boundary conditions built from the project configuration
//! - End conditions (fixed duration, cooling-rate threshold, equilibrium)
//! - `predict_microstructure` over the probe locations of a finished cycle

pub mod boundary;
pub mod cycle;
pub mod end_condition;
pub mod error;
pub mod microstructure;
pub mod orchestrator;

pub use boundary::{AmbientSchedule, StageBoundary};
pub use cycle::{CycleFailure, CycleResult, PhaseRun, PhaseSummary, rate_series};
pub use end_condition::{EndMonitor, PhaseEnd};
pub use error::{SimError, SimResult};
pub use microstructure::{LocationMicrostructure, predict_microstructure};
pub use orchestrator::{CycleProgress, MultiPhaseOrchestrator, RunHooks, Stage, plan_stages};
