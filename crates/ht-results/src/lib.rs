//! ht-results: typed result records, immutable run snapshots and their stores.

pub mod collect;
pub mod diff;
pub mod hash;
pub mod snapshot;
pub mod store;
pub mod types;

pub use collect::collect_results;
pub use diff::{FieldChange, diff_snapshots};
pub use hash::input_hash;
pub use snapshot::{
    SimulationSnapshot, SnapshotInputs, SnapshotOutputs, SnapshotStatus, SnapshotStore,
};
pub use store::ResultStore;
pub use types::*;

use ht_core::SimulationId;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No results stored for simulation {simulation_id} version {version}")]
    ResultsNotFound {
        simulation_id: SimulationId,
        version: u32,
    },

    #[error("Snapshot {version} of simulation {simulation_id} not found")]
    SnapshotNotFound {
        simulation_id: SimulationId,
        version: u32,
    },

    #[error("Snapshot {version} of simulation {simulation_id} already exists")]
    SnapshotExists {
        simulation_id: SimulationId,
        version: u32,
    },
}
