use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ht_app::*;
use ht_core::SimulationId;
use ht_mesh::Geometry;
use ht_project::{MaterialDef, PhaseConfig, PhaseKind, SimulationConfig};

fn config(name: &str) -> SimulationConfig {
    SimulationConfig::new(
        name,
        Geometry::Cylinder {
            radius: 0.02,
            length: 0.1,
        },
        MaterialDef::catalog("AISI 4130"),
    )
}

fn submit(store: &dyn JobStore, name: &str) -> SimulationId {
    let r = store.create(name, config(name)).unwrap();
    store.mark_ready(r.id).unwrap();
    store.enqueue(r.id).unwrap().id
}

fn quick() -> SchedulerConfig {
    SchedulerConfig {
        poll_interval: Duration::from_millis(10),
        worker_id: "test-worker".to_string(),
        ..SchedulerConfig::default()
    }
}

fn wait_for(store: &dyn JobStore, id: SimulationId, status: SimulationStatus) -> SimulationRecord {
    let start = Instant::now();
    loop {
        let record = store.get(id).unwrap();
        if record.status == status {
            return record;
        }
        assert!(
            start.elapsed() < Duration::from_secs(30),
            "{id} stuck in {}",
            record.status
        );
        thread::sleep(Duration::from_millis(5));
    }
}

/// Completes at once unless the job is named "boom", which panics.
struct Instantly;

impl JobExecutor for Instantly {
    fn execute(&self, record: &SimulationRecord, ctx: &JobContext) -> RunOutcome {
        if record.name == "boom" {
            panic!("kaboom");
        }
        ctx.report(ProgressUpdate {
            percent: 50,
            phase: Some(PhaseKind::Quenching),
            ..ProgressUpdate::default()
        });
        RunOutcome::completed(RunRecord {
            completed_phases: vec![PhaseKind::Quenching],
            result_version: None,
        })
    }
}

/// Reports progress until cancelled.
struct UntilCancelled;

impl JobExecutor for UntilCancelled {
    fn execute(&self, _record: &SimulationRecord, ctx: &JobContext) -> RunOutcome {
        for i in 0..6000u32 {
            if ctx.is_cancelled() {
                return RunOutcome::failed(Failure::cancelled(), RunRecord::default());
            }
            ctx.report(ProgressUpdate {
                percent: (i / 100).min(99) as u8,
                phase: Some(PhaseKind::Heating),
                ..ProgressUpdate::default()
            });
            thread::sleep(Duration::from_millis(5));
        }
        RunOutcome::completed(RunRecord::default())
    }
}

#[test]
fn drain_runs_jobs_in_submission_order() {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let ids: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|n| submit(store.as_ref(), n))
        .collect();
    let scheduler = Scheduler::new(Arc::clone(&store), Arc::new(Instantly), quick());

    let reports = scheduler.drain().unwrap();
    let ran: Vec<_> = reports.iter().map(|r| r.id).collect();
    assert_eq!(ran, ids);
    assert!(
        reports
            .iter()
            .all(|r| r.status == SimulationStatus::Completed)
    );
    let view = poll(store.as_ref(), ids[0]).unwrap();
    assert_eq!(view.phases, vec![PhaseKind::Quenching]);
    assert!(scheduler.run_once().unwrap().is_none());
}

#[test]
fn panicking_executor_fails_the_job_and_the_worker_moves_on() {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let boom = submit(store.as_ref(), "boom");
    let fine = submit(store.as_ref(), "fine");
    let scheduler = Scheduler::new(Arc::clone(&store), Arc::new(Instantly), quick());

    scheduler.start().unwrap();
    let failed = wait_for(store.as_ref(), boom, SimulationStatus::Failed);
    wait_for(store.as_ref(), fine, SimulationStatus::Completed);
    scheduler.stop();
    assert!(!scheduler.is_running());

    let failure = failed.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::Internal);
    assert!(failure.message.contains("kaboom"), "{}", failure.message);
    assert!(failed.lease.is_none());
}

#[test]
fn cancel_stops_a_running_job() {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let id = submit(store.as_ref(), "long");
    let scheduler = Scheduler::new(Arc::clone(&store), Arc::new(UntilCancelled), quick());
    scheduler.start().unwrap();
    wait_for(store.as_ref(), id, SimulationStatus::Running);

    let flagged = scheduler.cancel(id).unwrap();
    assert!(flagged.cancel_requested);
    let done = wait_for(store.as_ref(), id, SimulationStatus::Failed);
    scheduler.stop();

    let failure = done.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::Cancelled);
    assert_eq!(failure.message, CANCELLED_MESSAGE);
    // Cancelling a finished job changes nothing.
    assert_eq!(scheduler.cancel(id).unwrap().status, SimulationStatus::Failed);
}

#[test]
fn cancel_flag_written_by_another_process_reaches_the_worker() {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let id = submit(store.as_ref(), "long");
    let scheduler = Scheduler::new(Arc::clone(&store), Arc::new(UntilCancelled), quick());
    scheduler.start().unwrap();
    wait_for(store.as_ref(), id, SimulationStatus::Running);

    // Bypass the scheduler: only the persisted flag is set.
    store.request_cancel(id).unwrap();
    let done = wait_for(store.as_ref(), id, SimulationStatus::Failed);
    scheduler.stop();
    assert_eq!(done.failure.map(|f| f.kind), Some(FailureKind::Cancelled));
}

#[test]
fn reconcile_interrupts_orphans_and_keeps_the_queue() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let (orphan, waiting) = {
        let store = FileJobStore::open(&path).unwrap();
        let orphan = submit(&store, "orphan");
        let waiting = submit(&store, "waiting");
        store.claim_next("dead-worker", chrono::Duration::minutes(10)).unwrap();
        (orphan, waiting)
    };

    let store: Arc<dyn JobStore> = Arc::new(FileJobStore::open(&path).unwrap());
    let scheduler = Scheduler::new(Arc::clone(&store), Arc::new(Instantly), quick());
    assert_eq!(scheduler.reconcile().unwrap(), vec![orphan]);

    let record = store.get(orphan).unwrap();
    assert_eq!(record.status, SimulationStatus::Failed);
    let failure = record.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::Interrupted);
    assert_eq!(
        failure.message,
        "interrupted: worker terminated before the job finished"
    );
    assert_eq!(store.get(waiting).unwrap().status, SimulationStatus::Queued);
    assert!(scheduler.reconcile().unwrap().is_empty());
}

#[test]
fn lease_recovery_spares_live_workers() {
    let store = MemoryJobStore::new();
    let stale = submit(&store, "stale");
    let live = submit(&store, "live");
    store.claim_next("gone", chrono::Duration::seconds(-1)).unwrap();
    store.claim_next("alive", chrono::Duration::minutes(10)).unwrap();

    let recovered = store.recover(RecoveryPolicy::ExpiredLeases).unwrap();
    assert_eq!(recovered, vec![stale]);
    assert_eq!(store.get(live).unwrap().status, SimulationStatus::Running);
}

fn small_quench(name: &str) -> SimulationConfig {
    let mut cfg = SimulationConfig::new(
        name,
        Geometry::Cylinder {
            radius: 0.005,
            length: 0.05,
        },
        MaterialDef::catalog("AISI 4130"),
    );
    cfg.phases.retain(|p| p.kind() == PhaseKind::Quenching);
    cfg.solver.n_nodes = 11;
    cfg.solver.dt_s = 0.25;
    if let Some(PhaseConfig::Quenching(q)) = cfg.phase_mut(PhaseKind::Quenching) {
        q.duration_s = 60.0;
    }
    cfg
}

#[test]
fn simulation_executor_stores_results_and_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let jobs = FileJobStore::open(dir.path().join("jobs.json")).unwrap();
    let store: Arc<dyn JobStore> = Arc::new(jobs);
    let executor = Arc::new(SimulationExecutor::in_dir(dir.path()).unwrap());
    let scheduler = Scheduler::new(Arc::clone(&store), executor.clone(), quick());

    let r = store.create("pin", small_quench("pin")).unwrap();
    store.mark_ready(r.id).unwrap();
    store.enqueue(r.id).unwrap();
    let report = scheduler.run_once().unwrap().unwrap();
    assert_eq!(report.status, SimulationStatus::Completed, "{:?}", report.failure);

    let view = poll(store.as_ref(), r.id).unwrap();
    assert_eq!(view.progress_percent, 100);
    assert_eq!(view.phases, vec![PhaseKind::Quenching]);
    assert_eq!(view.result_version, Some(1));

    let snapshot = executor.snapshots().latest(r.id).unwrap().unwrap();
    assert_eq!(snapshot.version, 1);
    assert!(!snapshot.outputs.microstructure.is_empty());
    let results = executor.results().load(r.id, 1).unwrap();
    assert_eq!(results.len(), snapshot.outputs.result_keys.len());
}

#[test]
fn rejected_config_fails_without_storing_anything() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let executor = Arc::new(SimulationExecutor::in_dir(dir.path()).unwrap());

    let id = submit(store.as_ref(), "ok");
    let mut broken = small_quench("ok");
    broken.material = MaterialDef::catalog("unobtainium");
    // Simulate a config edited underneath the queue.
    let record = SimulationRecord {
        config: broken,
        ..store.get(id).unwrap()
    };
    let ctx = JobContext::new(
        id,
        Arc::clone(&store),
        Arc::new(std::sync::atomic::AtomicBool::new(false)),
        None,
        chrono::Duration::minutes(1),
        1,
    );
    let outcome = executor.execute(&record, &ctx);
    let failure = outcome.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::MaterialConfiguration);
    assert_eq!(outcome.run.result_version, None);
    assert!(executor.snapshots().latest(id).unwrap().is_none());
}

/// Sweeps every running job, including its own, before running `inner`.
struct SweptAway<E> {
    store: Arc<dyn JobStore>,
    inner: E,
}

impl<E: JobExecutor> JobExecutor for SweptAway<E> {
    fn execute(&self, record: &SimulationRecord, ctx: &JobContext) -> RunOutcome {
        if record.name == "swept" {
            self.store.recover(RecoveryPolicy::AllRunning).unwrap();
        }
        self.inner.execute(record, ctx)
    }
}

#[test]
fn drain_continues_after_a_job_is_swept_by_recovery() {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let swept = submit(store.as_ref(), "swept");
    let next = submit(store.as_ref(), "next");
    let executor = SweptAway {
        store: Arc::clone(&store),
        inner: Instantly,
    };
    let scheduler = Scheduler::new(Arc::clone(&store), Arc::new(executor), quick());

    let reports = scheduler.drain().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].id, swept);
    assert_eq!(reports[0].status, SimulationStatus::Failed);
    assert_eq!(
        reports[0].failure.as_ref().map(|f| f.message.as_str()),
        Some(INTERRUPTED_MESSAGE)
    );
    assert_eq!(reports[1].id, next);
    assert_eq!(reports[1].status, SimulationStatus::Completed);
    // The sweep's verdict stands.
    let record = store.get(swept).unwrap();
    assert_eq!(record.failure.map(|f| f.kind), Some(FailureKind::Interrupted));
}

#[test]
fn swept_simulation_leaves_no_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let simulation = SimulationExecutor::in_dir(dir.path()).unwrap();
    let snapshots = simulation.snapshots().clone();
    let executor = SweptAway {
        store: Arc::clone(&store),
        inner: simulation,
    };
    let scheduler = Scheduler::new(Arc::clone(&store), Arc::new(executor), quick());

    let r = store.create("swept", small_quench("swept")).unwrap();
    store.mark_ready(r.id).unwrap();
    store.enqueue(r.id).unwrap();
    let report = scheduler.run_once().unwrap().unwrap();
    assert_eq!(report.status, SimulationStatus::Failed);
    assert!(snapshots.latest(r.id).unwrap().is_none());
    assert_eq!(store.get(r.id).unwrap().result_version, None);
}

#[test]
fn failed_result_write_leaves_no_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let executor = Arc::new(SimulationExecutor::in_dir(dir.path()).unwrap());
    let scheduler = Scheduler::new(Arc::clone(&store), executor.clone(), quick());

    let r = store.create("pin", small_quench("pin")).unwrap();
    store.mark_ready(r.id).unwrap();
    store.enqueue(r.id).unwrap();
    // A plain file where the version directory should go.
    let blocked = dir.path().join("results").join(r.id.to_string());
    std::fs::create_dir_all(&blocked).unwrap();
    std::fs::write(blocked.join("v1"), b"").unwrap();

    let report = scheduler.run_once().unwrap().unwrap();
    assert_eq!(report.status, SimulationStatus::Failed);
    let failure = report.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::Internal);
    assert!(failure.message.starts_with("saving results failed"));
    assert!(executor.snapshots().latest(r.id).unwrap().is_none());
}
