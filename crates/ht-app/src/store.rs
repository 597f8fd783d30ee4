//! Persistent job table and the stores that guard it.
//!
//! Every lifecycle operation is a read-modify-write on one [`JobTable`]
//! under the store lock, so concurrent workers and pollers never observe a
//! half-applied change.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use ht_core::SimulationId;
use ht_project::{PhaseKind, SimulationConfig, ValidationError, validate_config};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::job::{Failure, SimulationRecord, SimulationStatus, WorkerLease};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Simulation {id} not found")]
    NotFound { id: SimulationId },

    #[error("Simulation {id}: cannot move from {from} to {to}")]
    InvalidTransition {
        id: SimulationId,
        from: SimulationStatus,
        to: SimulationStatus,
    },

    #[error("Simulation {id} is {status}; its configuration cannot change")]
    ConfigLocked {
        id: SimulationId,
        status: SimulationStatus,
    },

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which running records a startup sweep fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Every running record; for a single worker process restarting.
    #[default]
    AllRunning,
    /// Only records whose lease has expired; for several worker processes
    /// sharing one store.
    ExpiredLeases,
}

/// Reported by a worker while a job runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    pub percent: u8,
    pub phase: Option<PhaseKind>,
    pub message: Option<String>,
    pub completed_phases: Option<Vec<PhaseKind>>,
}

/// What a finished run leaves on the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunRecord {
    pub completed_phases: Vec<PhaseKind>,
    pub result_version: Option<u32>,
}

/// Every simulation record. Serialized as one document by [`FileJobStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobTable {
    next_index: u32,
    records: Vec<SimulationRecord>,
}

impl JobTable {
    pub fn records(&self) -> &[SimulationRecord] {
        &self.records
    }

    pub fn get(&self, id: SimulationId) -> StoreResult<&SimulationRecord> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound { id })
    }

    fn get_mut(&mut self, id: SimulationId) -> StoreResult<&mut SimulationRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound { id })
    }

    /// Queued records in claim order.
    pub fn queue(&self) -> Vec<&SimulationRecord> {
        let mut queued: Vec<&SimulationRecord> = self
            .records
            .iter()
            .filter(|r| r.status == SimulationStatus::Queued)
            .collect();
        queued.sort_by_key(|r| r.queue_key());
        queued
    }

    /// 1-based rank in the queue; `None` unless queued.
    pub fn queue_position(&self, id: SimulationId) -> Option<usize> {
        self.queue().iter().position(|r| r.id == id).map(|i| i + 1)
    }

    fn transition(
        &mut self,
        id: SimulationId,
        to: SimulationStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<&mut SimulationRecord> {
        let record = self.get_mut(id)?;
        if !record.status.can_transition(to) {
            return Err(StoreError::InvalidTransition {
                id,
                from: record.status,
                to,
            });
        }
        debug!(simulation_id = %id, from = %record.status, to = %to, "status change");
        record.status = to;
        record.updated_at = now;
        Ok(record)
    }

    fn create(
        &mut self,
        name: String,
        config: SimulationConfig,
        now: DateTime<Utc>,
    ) -> SimulationRecord {
        let id = SimulationId::from_index(self.next_index);
        self.next_index += 1;
        let record = SimulationRecord::new(id, name, config, now);
        self.records.push(record.clone());
        record
    }

    fn update_config(
        &mut self,
        id: SimulationId,
        config: SimulationConfig,
        now: DateTime<Utc>,
    ) -> StoreResult<SimulationRecord> {
        let status = self.get(id)?.status;
        if status.is_active() {
            return Err(StoreError::ConfigLocked { id, status });
        }
        let record = if status == SimulationStatus::Draft {
            self.get_mut(id)?
        } else {
            self.transition(id, SimulationStatus::Draft, now)?
        };
        record.config = config;
        record.updated_at = now;
        Ok(record.clone())
    }

    fn mark_ready(
        &mut self,
        id: SimulationId,
        now: DateTime<Utc>,
    ) -> StoreResult<SimulationRecord> {
        let record = self.get(id)?;
        if record.status == SimulationStatus::Ready {
            return Ok(record.clone());
        }
        if record.status != SimulationStatus::Draft {
            return Err(StoreError::InvalidTransition {
                id,
                from: record.status,
                to: SimulationStatus::Ready,
            });
        }
        validate_config(&record.config)?;
        Ok(self.transition(id, SimulationStatus::Ready, now)?.clone())
    }

    fn enqueue(&mut self, id: SimulationId, now: DateTime<Utc>) -> StoreResult<SimulationRecord> {
        let record = self.transition(id, SimulationStatus::Queued, now)?;
        record.queued_at = Some(now);
        record.started_at = None;
        record.completed_at = None;
        record.failure = None;
        record.cancel_requested = false;
        record.progress = Default::default();
        record.completed_phases.clear();
        Ok(record.clone())
    }

    fn claim_next(
        &mut self,
        worker_id: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<SimulationRecord>> {
        let Some(id) = self.queue().first().map(|r| r.id) else {
            return Ok(None);
        };
        let record = self.transition(id, SimulationStatus::Running, now)?;
        record.started_at = Some(now);
        record.lease = Some(WorkerLease {
            worker_id: worker_id.to_string(),
            heartbeat_at: now,
            expires_at: now + lease,
        });
        Ok(Some(record.clone()))
    }

    fn update_progress(
        &mut self,
        id: SimulationId,
        update: ProgressUpdate,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let record = self.get_mut(id)?;
        if record.status != SimulationStatus::Running {
            // A finished or swept job reports as cancelled so its worker stops.
            return Ok(true);
        }
        record.progress.percent = record.progress.percent.max(update.percent.min(100));
        record.progress.phase = update.phase.or(record.progress.phase);
        if update.message.is_some() {
            record.progress.message = update.message;
        }
        if let Some(phases) = update.completed_phases {
            record.completed_phases = phases;
        }
        if let Some(l) = record.lease.as_mut() {
            l.heartbeat_at = now;
            l.expires_at = now + lease;
        }
        record.updated_at = now;
        Ok(record.cancel_requested)
    }

    fn complete(
        &mut self,
        id: SimulationId,
        run: RunRecord,
        now: DateTime<Utc>,
    ) -> StoreResult<SimulationRecord> {
        let record = self.transition(id, SimulationStatus::Completed, now)?;
        record.progress.percent = 100;
        record.progress.phase = None;
        record.progress.message = Some("completed".to_string());
        record.completed_phases = run.completed_phases;
        record.result_version = run.result_version;
        record.completed_at = Some(now);
        record.lease = None;
        Ok(record.clone())
    }

    fn fail(
        &mut self,
        id: SimulationId,
        failure: Failure,
        run: RunRecord,
        now: DateTime<Utc>,
    ) -> StoreResult<SimulationRecord> {
        let record = self.transition(id, SimulationStatus::Failed, now)?;
        record.progress.message = Some(failure.message.clone());
        record.progress.phase = None;
        record.failure = Some(failure);
        record.completed_phases = run.completed_phases;
        if run.result_version.is_some() {
            record.result_version = run.result_version;
        }
        record.completed_at = Some(now);
        record.lease = None;
        Ok(record.clone())
    }

    fn request_cancel(
        &mut self,
        id: SimulationId,
        now: DateTime<Utc>,
    ) -> StoreResult<SimulationRecord> {
        let status = self.get(id)?.status;
        match status {
            SimulationStatus::Queued => {
                self.fail(id, Failure::cancelled(), RunRecord::default(), now)
            }
            SimulationStatus::Running => {
                let record = self.get_mut(id)?;
                if !record.cancel_requested {
                    record.cancel_requested = true;
                    record.updated_at = now;
                }
                Ok(record.clone())
            }
            _ => Ok(self.get(id)?.clone()),
        }
    }

    fn recover(
        &mut self,
        policy: RecoveryPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<SimulationId>> {
        let orphaned: Vec<SimulationId> = self
            .records
            .iter()
            .filter(|r| r.status == SimulationStatus::Running)
            .filter(|r| match policy {
                RecoveryPolicy::AllRunning => true,
                RecoveryPolicy::ExpiredLeases => {
                    r.lease.as_ref().is_none_or(|l| l.expires_at <= now)
                }
            })
            .map(|r| r.id)
            .collect();
        for id in &orphaned {
            let phases = self.get(*id)?.completed_phases.clone();
            self.fail(
                *id,
                Failure::interrupted(),
                RunRecord {
                    completed_phases: phases,
                    result_version: None,
                },
                now,
            )?;
        }
        Ok(orphaned)
    }
}

/// Storage for simulation records.
///
/// Implementors provide the two locked accessors; the lifecycle operations
/// are shared.
pub trait JobStore: Send + Sync {
    /// Apply `op` to the table under the store lock and persist the result
    /// when it succeeds.
    fn transact(&self, op: &mut dyn FnMut(&mut JobTable) -> StoreResult<()>) -> StoreResult<()>;

    /// Read the table under the store lock.
    fn read(&self, op: &mut dyn FnMut(&JobTable)) -> StoreResult<()>;

    fn create(&self, name: &str, config: SimulationConfig) -> StoreResult<SimulationRecord> {
        let record = apply(self, |t| Ok(t.create(name.to_string(), config.clone(), Utc::now())))?;
        info!(simulation_id = %record.id, name = %record.name, "simulation created");
        Ok(record)
    }

    fn get(&self, id: SimulationId) -> StoreResult<SimulationRecord> {
        let mut out = None;
        self.read(&mut |t| out = Some(t.get(id).cloned()))?;
        out.unwrap_or(Err(StoreError::NotFound { id }))
    }

    fn list(&self) -> StoreResult<Vec<SimulationRecord>> {
        let mut out = Vec::new();
        self.read(&mut |t| out = t.records().to_vec())?;
        Ok(out)
    }

    /// Edit the configuration; finished and ready records return to draft.
    fn update_config(
        &self,
        id: SimulationId,
        config: SimulationConfig,
    ) -> StoreResult<SimulationRecord> {
        apply(self, |t| t.update_config(id, config.clone(), Utc::now()))
    }

    /// Validate and move draft → ready. An invalid configuration stays draft.
    fn mark_ready(&self, id: SimulationId) -> StoreResult<SimulationRecord> {
        apply(self, |t| t.mark_ready(id, Utc::now()))
    }

    /// Queue a ready or finished record, clearing the previous run's failure.
    fn enqueue(&self, id: SimulationId) -> StoreResult<SimulationRecord> {
        let record = apply(self, |t| t.enqueue(id, Utc::now()))?;
        info!(simulation_id = %id, "simulation queued");
        Ok(record)
    }

    /// Take the oldest queued record and mark it running under `worker_id`.
    fn claim_next(
        &self,
        worker_id: &str,
        lease: Duration,
    ) -> StoreResult<Option<SimulationRecord>> {
        apply(self, |t| t.claim_next(worker_id, lease, Utc::now()))
    }

    /// Record progress and renew the lease. Returns whether cancellation was
    /// requested.
    fn update_progress(
        &self,
        id: SimulationId,
        update: ProgressUpdate,
        lease: Duration,
    ) -> StoreResult<bool> {
        apply(self, |t| t.update_progress(id, update.clone(), lease, Utc::now()))
    }

    fn complete(&self, id: SimulationId, run: RunRecord) -> StoreResult<SimulationRecord> {
        apply(self, |t| t.complete(id, run.clone(), Utc::now()))
    }

    fn fail(
        &self,
        id: SimulationId,
        failure: Failure,
        run: RunRecord,
    ) -> StoreResult<SimulationRecord> {
        apply(self, |t| t.fail(id, failure.clone(), run.clone(), Utc::now()))
    }

    /// Queued records fail at once; running ones are flagged for the worker.
    /// Idempotent.
    fn request_cancel(&self, id: SimulationId) -> StoreResult<SimulationRecord> {
        apply(self, |t| t.request_cancel(id, Utc::now()))
    }

    /// Fail running records left behind by a dead worker.
    fn recover(&self, policy: RecoveryPolicy) -> StoreResult<Vec<SimulationId>> {
        apply(self, |t| t.recover(policy, Utc::now()))
    }
}

fn apply<S, T, F>(store: &S, mut f: F) -> StoreResult<T>
where
    S: JobStore + ?Sized,
    F: FnMut(&mut JobTable) -> StoreResult<T>,
{
    let mut out = None;
    store.transact(&mut |t| {
        out = Some(f(t)?);
        Ok(())
    })?;
    out.ok_or_else(|| StoreError::Io(std::io::Error::other("store operation did not run")))
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    table: Mutex<JobTable>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn transact(&self, op: &mut dyn FnMut(&mut JobTable) -> StoreResult<()>) -> StoreResult<()> {
        let mut table = self.table.lock();
        // Work on a copy so a failed operation leaves nothing behind.
        let mut draft = table.clone();
        op(&mut draft)?;
        *table = draft;
        Ok(())
    }

    fn read(&self, op: &mut dyn FnMut(&JobTable)) -> StoreResult<()> {
        op(&self.table.lock());
        Ok(())
    }
}

/// Store kept as one JSON document, rewritten atomically (temp file and
/// rename) after every change.
#[derive(Debug)]
pub struct FileJobStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileJobStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<JobTable> {
        if !self.path.exists() {
            return Ok(JobTable::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, table: &JobTable) -> StoreResult<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(table)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl JobStore for FileJobStore {
    fn transact(&self, op: &mut dyn FnMut(&mut JobTable) -> StoreResult<()>) -> StoreResult<()> {
        let _guard = self.lock.lock();
        let mut table = self.load()?;
        op(&mut table)?;
        self.save(&table)
    }

    fn read(&self, op: &mut dyn FnMut(&JobTable)) -> StoreResult<()> {
        let _guard = self.lock.lock();
        op(&self.load()?);
        Ok(())
    }
}
