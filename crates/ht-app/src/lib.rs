//! Application service layer for heat-treatment simulations.
//!
//! Simulations are persisted records with a lifecycle
//! (draft → ready → queued → running → completed | failed). A [`Scheduler`]
//! claims queued records from a [`JobStore`] and runs them on a background
//! worker; [`poll`] and [`queue_status`] give read-only views for front ends.

pub mod context;
pub mod error;
pub mod job;
pub mod query;
pub mod run_service;
pub mod scheduler;
pub mod store;

pub use context::{JobContext, RunOutcome};
pub use error::{AppError, AppResult};
pub use job::{
    CANCELLED_MESSAGE, Failure, FailureKind, INTERRUPTED_MESSAGE, Progress, SimulationRecord,
    SimulationStatus, WorkerLease,
};
pub use query::{JobView, QueueStatus, poll, queue_status};
pub use run_service::{SimulationExecutor, classify, execute_simulation};
pub use scheduler::{JobExecutor, JobReport, Scheduler, SchedulerConfig};
pub use store::{
    FileJobStore, JobStore, JobTable, MemoryJobStore, ProgressUpdate, RecoveryPolicy, RunRecord,
    StoreError, StoreResult,
};
