//! What an executor sees of the scheduler while it runs one job.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use ht_core::SimulationId;
use ht_project::PhaseKind;
use ht_sim::CycleProgress;
use parking_lot::Mutex;
use tracing::warn;

use crate::job::{Failure, SimulationStatus};
use crate::store::{JobStore, ProgressUpdate, RunRecord};

/// Result of executing one job.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub failure: Option<Failure>,
    pub run: RunRecord,
}

impl RunOutcome {
    pub fn completed(run: RunRecord) -> Self {
        Self { failure: None, run }
    }

    pub fn failed(failure: Failure, run: RunRecord) -> Self {
        Self {
            failure: Some(failure),
            run,
        }
    }

    pub fn status(&self) -> SimulationStatus {
        if self.failure.is_some() {
            SimulationStatus::Failed
        } else {
            SimulationStatus::Completed
        }
    }
}

#[derive(Debug, Default)]
struct Reported {
    percent: Option<u8>,
    phase: Option<PhaseKind>,
}

/// Progress sink, cancellation flag and wall-clock budget of a running job.
pub struct JobContext {
    id: SimulationId,
    store: Arc<dyn JobStore>,
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
    lease: chrono::Duration,
    throttle_percent: u8,
    reported: Mutex<Reported>,
}

impl JobContext {
    pub fn new(
        id: SimulationId,
        store: Arc<dyn JobStore>,
        cancelled: Arc<AtomicBool>,
        deadline: Option<Instant>,
        lease: chrono::Duration,
        throttle_percent: u8,
    ) -> Self {
        Self {
            id,
            store,
            cancelled,
            deadline,
            lease,
            throttle_percent,
            reported: Mutex::new(Reported::default()),
        }
    }

    pub fn id(&self) -> SimulationId {
        self.id
    }

    /// Set by `Scheduler::cancel` or seen on the record at the last progress
    /// write.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// False once the record left `Running` underneath this worker, e.g.
    /// after a recovery sweep. Read errors count as still owned.
    pub fn still_owned(&self) -> bool {
        match self.store.get(self.id) {
            Ok(record) => record.status == SimulationStatus::Running,
            Err(e) => {
                warn!(simulation_id = %self.id, error = %e, "ownership check failed");
                true
            }
        }
    }

    /// Persist `update` if it moved by at least the throttle or entered a new
    /// stage.
    pub fn report(&self, update: ProgressUpdate) {
        let due = {
            let reported = self.reported.lock();
            match reported.percent {
                None => true,
                Some(last) => {
                    update.phase != reported.phase
                        || update.percent >= last.saturating_add(self.throttle_percent)
                        || update.completed_phases.is_some()
                }
            }
        };
        if due {
            self.persist(update);
        }
    }

    /// Convert orchestrator progress into a throttled update.
    pub fn report_cycle(&self, progress: &CycleProgress, completed: &[PhaseKind]) {
        let percent = (progress.overall_fraction * 100.0).round().clamp(0.0, 100.0) as u8;
        let at_boundary = progress.phase_fraction <= 0.0 || progress.phase_fraction >= 1.0;
        self.report(ProgressUpdate {
            percent,
            phase: Some(progress.phase),
            message: Some(format!(
                "{} ({}/{})",
                progress.phase,
                progress.phase_index + 1,
                progress.total_phases
            )),
            completed_phases: at_boundary.then(|| completed.to_vec()),
        });
    }

    fn persist(&self, update: ProgressUpdate) {
        let (percent, phase) = (update.percent, update.phase);
        match self.store.update_progress(self.id, update, self.lease) {
            Ok(cancel) => {
                if cancel {
                    self.cancelled.store(true, Ordering::SeqCst);
                }
                let mut reported = self.reported.lock();
                reported.percent = Some(percent);
                reported.phase = phase;
            }
            Err(e) => warn!(simulation_id = %self.id, error = %e, "progress not saved"),
        }
    }
}
