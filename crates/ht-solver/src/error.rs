//! Error types for solver operations.

use ht_material::MaterialError;
use ht_mesh::MeshError;
use thiserror::Error;

/// Errors raised while integrating a phase.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Configuration error: {what}")]
    Configuration { what: String },

    #[error("Material configuration error: {0}")]
    Material(#[from] MaterialError),

    #[error("Initial field has {got} values but the mesh has {expected} nodes")]
    FieldLength { expected: usize, got: usize },

    #[error("Solver diverged at step {step} (t = {time_s:.3} s): {what}")]
    Divergence {
        what: String,
        step: usize,
        time_s: f64,
    },

    #[error("Interrupted at t = {time_s:.3} s")]
    Interrupted { time_s: f64 },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<MeshError> for SolverError {
    fn from(e: MeshError) -> Self {
        SolverError::Configuration {
            what: e.to_string(),
        }
    }
}

impl SolverError {
    /// True for errors caused by the material data rather than numerics.
    pub fn is_material(&self) -> bool {
        matches!(self, SolverError::Material(_) | SolverError::FieldLength { .. })
    }
}
