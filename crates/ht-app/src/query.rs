//! Read-only views of jobs for pollers.

use chrono::{DateTime, Utc};
use ht_core::SimulationId;
use ht_project::PhaseKind;
use ht_sim::plan_stages;
use serde::Serialize;

use crate::error::AppResult;
use crate::job::{FailureKind, SimulationRecord, SimulationStatus};
use crate::store::{JobStore, JobTable, StoreError};

/// A job as a poller sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    pub id: SimulationId,
    pub name: String,
    pub status: SimulationStatus,
    pub current_phase: Option<PhaseKind>,
    /// Stages finished so far in the latest run.
    pub phases: Vec<PhaseKind>,
    /// Stages the configured cycle runs, in order.
    pub planned_phases: Vec<PhaseKind>,
    pub total_phases: usize,
    pub progress_percent: u8,
    pub progress_message: Option<String>,
    pub queue_position: Option<usize>,
    pub error_message: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub cancel_requested: bool,
    pub result_version: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobView {
    fn from_record(table: &JobTable, r: &SimulationRecord) -> Self {
        let planned_phases: Vec<PhaseKind> =
            plan_stages(&r.config).iter().map(|s| s.kind).collect();
        Self {
            id: r.id,
            name: r.name.clone(),
            status: r.status,
            current_phase: r.progress.phase,
            phases: r.completed_phases.clone(),
            total_phases: planned_phases.len(),
            planned_phases,
            progress_percent: r.progress.percent,
            progress_message: r.progress.message.clone(),
            queue_position: table.queue_position(r.id),
            error_message: r.failure.as_ref().map(|f| f.message.clone()),
            failure_kind: r.failure.as_ref().map(|f| f.kind),
            cancel_requested: r.cancel_requested,
            result_version: r.result_version,
            created_at: r.created_at,
            updated_at: r.updated_at,
            queued_at: r.queued_at,
            started_at: r.started_at,
            completed_at: r.completed_at,
        }
    }
}

/// Current view of one job. Never modifies the store.
pub fn poll(store: &dyn JobStore, id: SimulationId) -> AppResult<JobView> {
    let mut view = None;
    store.read(&mut |t| {
        view = t.get(id).ok().map(|r| JobView::from_record(t, r));
    })?;
    Ok(view.ok_or(StoreError::NotFound { id })?)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueStatus {
    pub running: Vec<JobView>,
    /// In claim order.
    pub queued: Vec<JobView>,
}

pub fn queue_status(store: &dyn JobStore) -> AppResult<QueueStatus> {
    let mut status = QueueStatus::default();
    store.read(&mut |t| {
        status.running = t
            .records()
            .iter()
            .filter(|r| r.status == SimulationStatus::Running)
            .map(|r| JobView::from_record(t, r))
            .collect();
        status.queued = t
            .queue()
            .into_iter()
            .map(|r| JobView::from_record(t, r))
            .collect();
    })?;
    Ok(status)
}
