//! Background worker that drains the job queue.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use ht_core::SimulationId;
use parking_lot::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::context::{JobContext, RunOutcome};
use crate::error::AppResult;
use crate::job::{Failure, FailureKind, SimulationRecord, SimulationStatus};
use crate::store::{JobStore, RecoveryPolicy, RunRecord};

/// Runs one claimed job to completion. Implementations must not return
/// before the work has stopped; failures are reported in the outcome.
pub trait JobExecutor: Send + Sync {
    fn execute(&self, record: &SimulationRecord, ctx: &JobContext) -> RunOutcome;
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Sleep between queue polls when idle.
    pub poll_interval: Duration,
    /// Minimum percent change between persisted progress updates.
    pub progress_throttle_percent: u8,
    /// Lease granted on claim and renewed by every progress write.
    pub lease: Duration,
    pub recovery: RecoveryPolicy,
    /// Wall-clock budget per job.
    pub job_timeout: Option<Duration>,
    pub worker_id: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            progress_throttle_percent: 1,
            lease: Duration::from_secs(600),
            recovery: RecoveryPolicy::AllRunning,
            job_timeout: None,
            worker_id: format!("worker-{}", Uuid::new_v4()),
        }
    }
}

/// What happened to one claimed job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub id: SimulationId,
    pub status: SimulationStatus,
    pub failure: Option<Failure>,
}

struct Inner {
    store: Arc<dyn JobStore>,
    executor: Arc<dyn JobExecutor>,
    config: SchedulerConfig,
    stop: AtomicBool,
    /// Cancel flags of the jobs this scheduler is executing.
    active: Mutex<HashMap<SimulationId, Arc<AtomicBool>>>,
}

pub struct Scheduler {
    inner: Arc<Inner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn JobStore>,
        executor: Arc<dyn JobExecutor>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                executor,
                config,
                stop: AtomicBool::new(false),
                active: Mutex::new(HashMap::new()),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.inner.store
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Startup sweep: fail the running records a previous worker left
    /// behind. Queued records stay queued.
    pub fn reconcile(&self) -> AppResult<Vec<SimulationId>> {
        let recovered = self.inner.store.recover(self.inner.config.recovery)?;
        for id in &recovered {
            warn!(simulation_id = %id, "orphaned job marked interrupted");
        }
        Ok(recovered)
    }

    /// Claim and execute one job on the calling thread.
    pub fn run_once(&self) -> AppResult<Option<JobReport>> {
        self.inner.run_once()
    }

    /// Run jobs until the queue is empty.
    pub fn drain(&self) -> AppResult<Vec<JobReport>> {
        let mut reports = Vec::new();
        while let Some(report) = self.inner.run_once()? {
            reports.push(report);
        }
        Ok(reports)
    }

    /// Spawn the background worker. A second call is a no-op.
    pub fn start(&self) -> AppResult<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }
        self.inner.stop.store(false, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let handle = std::thread::Builder::new()
            .name("ht-worker".to_string())
            .spawn(move || inner.work_loop())?;
        *worker = Some(handle);
        info!(worker_id = %self.inner.config.worker_id, "worker started");
        Ok(())
    }

    /// Signal the worker and wait for it. The job in flight finishes first.
    pub fn stop(&self) {
        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        self.inner.stop.store(true, Ordering::SeqCst);
        handle.thread().unpark();
        if handle.join().is_err() {
            error!("worker thread panicked");
        }
        info!(worker_id = %self.inner.config.worker_id, "worker stopped");
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Request cancellation. Queued jobs fail immediately, running jobs stop
    /// at the next solver step. Idempotent.
    pub fn cancel(&self, id: SimulationId) -> AppResult<SimulationRecord> {
        let record = self.inner.store.request_cancel(id)?;
        if let Some(flag) = self.inner.active.lock().get(&id) {
            flag.store(true, Ordering::SeqCst);
        }
        info!(simulation_id = %id, status = %record.status, "cancel requested");
        Ok(record)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    fn work_loop(&self) {
        while !self.stop.load(Ordering::SeqCst) {
            match self.run_once() {
                Ok(Some(_)) => continue,
                Ok(None) => std::thread::park_timeout(self.config.poll_interval),
                Err(e) => {
                    error!(error = %e, "queue poll failed");
                    std::thread::park_timeout(self.config.poll_interval);
                }
            }
        }
    }

    fn run_once(&self) -> AppResult<Option<JobReport>> {
        let lease = chrono::Duration::from_std(self.config.lease)
            .unwrap_or_else(|_| chrono::Duration::minutes(10));
        let Some(record) = self.store.claim_next(&self.config.worker_id, lease)? else {
            return Ok(None);
        };
        let id = record.id;
        info!(
            simulation_id = %id,
            worker_id = %self.config.worker_id,
            name = %record.name,
            "job started"
        );

        let cancelled = Arc::new(AtomicBool::new(record.cancel_requested));
        self.active.lock().insert(id, Arc::clone(&cancelled));
        let ctx = JobContext::new(
            id,
            Arc::clone(&self.store),
            cancelled,
            self.config.job_timeout.map(|t| Instant::now() + t),
            lease,
            self.config.progress_throttle_percent,
        );

        let outcome = catch_unwind(AssertUnwindSafe(|| self.executor.execute(&record, &ctx)))
            .unwrap_or_else(|panic| {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                RunOutcome::failed(
                    Failure::new(FailureKind::Internal, format!("executor panicked: {message}")),
                    RunRecord::default(),
                )
            });
        self.active.lock().remove(&id);

        let saved = match &outcome.failure {
            None => self.store.complete(id, outcome.run.clone()),
            Some(failure) => self.store.fail(id, failure.clone(), outcome.run.clone()),
        };
        let record = match saved {
            Ok(record) => record,
            Err(e) => {
                // A recovery sweep may have settled the job while it ran.
                let stored = self.store.get(id)?;
                if stored.status == SimulationStatus::Running {
                    return Err(e.into());
                }
                warn!(
                    simulation_id = %id,
                    status = %stored.status,
                    outcome = %outcome.status(),
                    "job settled elsewhere, outcome discarded"
                );
                return Ok(Some(JobReport {
                    id,
                    status: stored.status,
                    failure: stored.failure,
                }));
            }
        };
        match &record.failure {
            None => info!(simulation_id = %id, "job completed"),
            Some(f) => {
                warn!(simulation_id = %id, kind = %f.kind, message = %f.message, "job failed")
            }
        }
        Ok(Some(JobReport {
            id,
            status: record.status,
            failure: record.failure,
        }))
    }
}
