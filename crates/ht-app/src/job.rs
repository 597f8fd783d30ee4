//! Simulation records and their lifecycle.

use chrono::{DateTime, Utc};
use ht_core::SimulationId;
use ht_project::{PhaseKind, SimulationConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    Draft,
    Ready,
    Queued,
    Running,
    Completed,
    Failed,
}

impl SimulationStatus {
    pub const ALL: [SimulationStatus; 6] = [
        SimulationStatus::Draft,
        SimulationStatus::Ready,
        SimulationStatus::Queued,
        SimulationStatus::Running,
        SimulationStatus::Completed,
        SimulationStatus::Failed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SimulationStatus::Draft => "draft",
            SimulationStatus::Ready => "ready",
            SimulationStatus::Queued => "queued",
            SimulationStatus::Running => "running",
            SimulationStatus::Completed => "completed",
            SimulationStatus::Failed => "failed",
        }
    }

    /// Queued or running.
    pub fn is_active(self) -> bool {
        matches!(self, SimulationStatus::Queued | SimulationStatus::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SimulationStatus::Completed | SimulationStatus::Failed)
    }

    /// Whether the lifecycle allows moving from `self` to `to`.
    pub fn can_transition(self, to: SimulationStatus) -> bool {
        use SimulationStatus::*;
        matches!(
            (self, to),
            (Draft, Ready)
                | (Ready, Draft)
                | (Ready, Queued)
                | (Completed, Queued)
                | (Failed, Queued)
                | (Queued, Running)
                | (Queued, Failed)
                | (Running, Completed)
                | (Running, Failed)
                | (Completed, Draft)
                | (Failed, Draft)
        )
    }
}

impl std::fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Category of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    MaterialConfiguration,
    SolverDivergence,
    Cancelled,
    Interrupted,
    Internal,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Configuration => "configuration",
            FailureKind::MaterialConfiguration => "material_configuration",
            FailureKind::SolverDivergence => "solver_divergence",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Interrupted => "interrupted",
            FailureKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub const CANCELLED_MESSAGE: &str = "cancelled by user";
pub const INTERRUPTED_MESSAGE: &str = "interrupted: worker terminated before the job finished";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, CANCELLED_MESSAGE)
    }

    pub fn interrupted() -> Self {
        Self::new(FailureKind::Interrupted, INTERRUPTED_MESSAGE)
    }
}

/// Claim held by the worker running a job; refreshed by progress updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerLease {
    pub worker_id: String,
    pub heartbeat_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// 0..=100, never decreases within one run.
    pub percent: u8,
    /// Stage currently executing.
    pub phase: Option<PhaseKind>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub id: SimulationId,
    pub name: String,
    pub config: SimulationConfig,
    pub status: SimulationStatus,
    #[serde(default)]
    pub progress: Progress,
    /// Stages that finished in the latest run.
    #[serde(default)]
    pub completed_phases: Vec<PhaseKind>,
    pub failure: Option<Failure>,
    #[serde(default)]
    pub cancel_requested: bool,
    pub lease: Option<WorkerLease>,
    /// Snapshot and results version written by the latest run.
    pub result_version: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SimulationRecord {
    pub(crate) fn new(
        id: SimulationId,
        name: String,
        config: SimulationConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            config,
            status: SimulationStatus::Draft,
            progress: Progress::default(),
            completed_phases: Vec::new(),
            failure: None,
            cancel_requested: false,
            lease: None,
            result_version: None,
            created_at: now,
            updated_at: now,
            queued_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// FIFO key of the queue.
    pub(crate) fn queue_key(&self) -> (Option<DateTime<Utc>>, DateTime<Utc>, SimulationId) {
        (self.queued_at, self.created_at, self.id)
    }
}
