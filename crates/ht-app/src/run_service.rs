//! Executes one simulation: cycle, kinetics, results and snapshot.

use std::path::Path;

use ht_project::{PhaseConfig, PhaseKind};
use ht_results::{
    ResultStore, SnapshotInputs, SnapshotOutputs, SnapshotStatus, SnapshotStore, collect_results,
};
use ht_sim::{
    CycleProgress, CycleResult, MultiPhaseOrchestrator, RunHooks, SimError,
    predict_microstructure,
};
use tracing::{info, warn};

use crate::context::{JobContext, RunOutcome};
use crate::error::AppResult;
use crate::job::{Failure, FailureKind, SimulationRecord};
use crate::scheduler::JobExecutor;
use crate::store::RunRecord;

/// Production executor writing into a result store and a snapshot store.
#[derive(Debug, Clone)]
pub struct SimulationExecutor {
    results: ResultStore,
    snapshots: SnapshotStore,
}

impl SimulationExecutor {
    pub fn new(results: ResultStore, snapshots: SnapshotStore) -> Self {
        Self { results, snapshots }
    }

    /// Stores under `<data_dir>/results` and `<data_dir>/snapshots`.
    pub fn in_dir(data_dir: &Path) -> AppResult<Self> {
        Ok(Self::new(
            ResultStore::new(data_dir.join("results"))?,
            SnapshotStore::new(data_dir.join("snapshots"))?,
        ))
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }
}

impl JobExecutor for SimulationExecutor {
    fn execute(&self, record: &SimulationRecord, ctx: &JobContext) -> RunOutcome {
        execute_simulation(&self.results, &self.snapshots, record, ctx)
    }
}

/// Map a cycle error onto the failure a user sees.
pub fn classify(error: &SimError, ctx: &JobContext) -> Failure {
    if error.is_interrupted() && ctx.is_cancelled() {
        return Failure::cancelled();
    }
    let kind = match error {
        _ if error.is_material() => FailureKind::MaterialConfiguration,
        SimError::Configuration(_) => FailureKind::Configuration,
        _ if error.is_divergence() => FailureKind::SolverDivergence,
        _ if error.is_interrupted() => FailureKind::Interrupted,
        SimError::Phase { .. } => FailureKind::Configuration,
    };
    Failure::new(kind, error.to_string())
}

/// Run the configured cycle for `record`.
///
/// A cycle that fails part-way still stores the results of the stages that
/// finished and a failed snapshot. Nothing is stored when the configuration
/// is rejected before the first stage.
pub fn execute_simulation(
    results: &ResultStore,
    snapshots: &SnapshotStore,
    record: &SimulationRecord,
    ctx: &JobContext,
) -> RunOutcome {
    let config = &record.config;
    let orchestrator = match MultiPhaseOrchestrator::new(config) {
        Ok(o) => o,
        Err(e) => return RunOutcome::failed(classify(&e, ctx), RunRecord::default()),
    };
    let material = orchestrator.material().clone();
    let transformation = config.transformation_for(&material);

    let mut completed: Vec<PhaseKind> = Vec::new();
    let mut on_progress = |p: &CycleProgress| {
        if p.phase_fraction >= 1.0 && !completed.contains(&p.phase) {
            completed.push(p.phase);
        }
        ctx.report_cycle(p, &completed);
    };
    let cancelled = || ctx.is_cancelled();
    let hooks = RunHooks {
        progress: Some(&mut on_progress),
        cancelled: Some(&cancelled),
        deadline: ctx.deadline(),
    };

    let (cycle, failure) = match orchestrator.run(hooks) {
        Ok(cycle) => (cycle, None),
        Err(f) => {
            let failure = classify(&f.error, ctx);
            (f.partial, Some(failure))
        }
    };
    let phases: Vec<PhaseKind> = cycle.phases.iter().map(|p| p.phase).collect();
    info!(
        simulation_id = %record.id,
        stages = phases.len(),
        failed = failure.is_some(),
        "cycle finished"
    );

    if !ctx.still_owned() {
        warn!(simulation_id = %record.id, "job settled elsewhere, results not saved");
        let failure = Failure::new(
            FailureKind::Interrupted,
            "job was settled by another process before its results were saved",
        );
        return RunOutcome::failed(
            failure,
            RunRecord {
                completed_phases: phases,
                result_version: None,
            },
        );
    }

    let persisted = persist(
        results,
        snapshots,
        record,
        &orchestrator,
        SnapshotInputs {
            config: config.clone(),
            material,
            transformation,
        },
        &cycle,
        failure.as_ref(),
    );

    let (failure, result_version) = match (failure, persisted) {
        (failure, Ok(version)) => (failure, Some(version)),
        (Some(failure), Err(e)) => {
            warn!(simulation_id = %record.id, error = %e, "partial results not saved");
            (Some(failure), None)
        }
        (None, Err(e)) => (
            Some(Failure::new(
                FailureKind::Internal,
                format!("saving results failed: {e}"),
            )),
            None,
        ),
    };
    let run = RunRecord {
        completed_phases: phases,
        result_version,
    };
    match failure {
        None => RunOutcome::completed(run),
        Some(failure) => RunOutcome::failed(failure, run),
    }
}

/// Predict microstructure when the quench ran, then write the results and the
/// snapshot under the same version.
fn persist(
    results: &ResultStore,
    snapshots: &SnapshotStore,
    record: &SimulationRecord,
    orchestrator: &MultiPhaseOrchestrator,
    inputs: SnapshotInputs,
    cycle: &CycleResult,
    failure: Option<&Failure>,
) -> AppResult<u32> {
    let microstructure = if cycle.phase(PhaseKind::Quenching).is_some() {
        let tempering = match record.config.phase(PhaseKind::Tempering) {
            Some(PhaseConfig::Tempering(t)) if cycle.phase(PhaseKind::Tempering).is_some() => {
                Some(t)
            }
            _ => None,
        };
        predict_microstructure(cycle, &inputs.transformation, tempering)?
    } else {
        Vec::new()
    };
    let positions = orchestrator.solver().mesh().positions();
    let records = collect_results(cycle, positions, &microstructure);

    let outputs = SnapshotOutputs {
        phases: cycle.summaries(),
        microstructure,
        result_keys: records.iter().map(|r| r.key).collect(),
    };
    let status = match failure {
        None => SnapshotStatus::Completed,
        Some(f) => SnapshotStatus::Failed {
            message: f.message.clone(),
        },
    };
    // Results first: a snapshot only exists once its results are on disk.
    let version = snapshots.next_version(record.id)?;
    let phases: Vec<PhaseKind> = cycle.phases.iter().map(|p| p.phase).collect();
    results.save(record.id, version, &phases, &records)?;
    let snapshot = snapshots.create_version(record.id, version, inputs, outputs, status)?;
    Ok(snapshot.version)
}
