//! Error types for the ht-app service layer.

use ht_core::SimulationId;

/// Errors surfaced to front ends. Failures inside a job are not errors of
/// this kind; they end up on the job record.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Project error: {0}")]
    Project(#[from] ht_project::ProjectError),

    #[error("Results error: {0}")]
    Results(#[from] ht_results::ResultsError),

    #[error("Kinetics error: {0}")]
    Kinetics(#[from] ht_kinetics::KineticsError),

    #[error("Simulation {0} has no stored run")]
    NoRun(SimulationId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
