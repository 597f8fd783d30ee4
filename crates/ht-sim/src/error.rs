//! Error types for cycle execution.

use ht_project::{PhaseKind, ValidationError};
use ht_solver::SolverError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ValidationError),

    #[error("{phase} phase failed: {source}")]
    Phase {
        phase: PhaseKind,
        #[source]
        source: SolverError,
    },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn phase(&self) -> Option<PhaseKind> {
        match self {
            SimError::Phase { phase, .. } => Some(*phase),
            SimError::Configuration(_) => None,
        }
    }

    pub fn is_material(&self) -> bool {
        match self {
            SimError::Configuration(e) => e.is_material(),
            SimError::Phase { source, .. } => source.is_material(),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            SimError::Phase {
                source: SolverError::Interrupted { .. },
                ..
            }
        )
    }

    pub fn is_divergence(&self) -> bool {
        matches!(
            self,
            SimError::Phase {
                source: SolverError::Divergence { .. },
                ..
            }
        )
    }
}
