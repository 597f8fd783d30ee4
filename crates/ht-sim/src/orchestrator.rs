//! Runs the enabled stages of a cycle back to back on one mesh.

use std::time::Instant;

use ht_material::MaterialModel;
use ht_project::{
    EndCondition, PhaseConfig, PhaseKind, SimulationConfig, ValidationError, validate_config,
};
use ht_solver::{BoundaryModel, PhaseControl, StepDecision, StepView, ThermalSolver};
use tracing::{debug, info};

use crate::boundary::{
    cooldown_boundary, heating_boundary, quench_boundary, tempering_boundary, transfer_boundary,
};
use crate::cycle::{CycleFailure, CycleResult, PhaseRun, PhaseSummary};
use crate::end_condition::EndMonitor;
use crate::error::{SimError, SimResult};

/// One stage ready to integrate.
pub struct Stage {
    pub kind: PhaseKind,
    pub boundary: Box<dyn BoundaryModel>,
    /// Upper bound on the stage length [s].
    pub duration_s: f64,
    pub end_condition: EndCondition,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("kind", &self.kind)
            .field("boundary", &self.boundary.label())
            .field("duration_s", &self.duration_s)
            .field("end_condition", &self.end_condition)
            .finish()
    }
}

/// Enabled stages in execution order; tempering brings its cool-down along.
pub fn plan_stages(config: &SimulationConfig) -> Vec<Stage> {
    let mut stages = Vec::new();
    for phase in config.enabled_phases() {
        match phase {
            PhaseConfig::Heating(c) => stages.push(Stage {
                kind: PhaseKind::Heating,
                boundary: heating_boundary(c),
                duration_s: c.duration_s(),
                end_condition: c.end_condition,
            }),
            PhaseConfig::Transfer(c) => stages.push(Stage {
                kind: PhaseKind::Transfer,
                boundary: transfer_boundary(c),
                duration_s: c.duration_s,
                end_condition: EndCondition::FixedDuration,
            }),
            PhaseConfig::Quenching(c) => stages.push(Stage {
                kind: PhaseKind::Quenching,
                boundary: quench_boundary(c),
                duration_s: c.duration_s,
                end_condition: c.end_condition,
            }),
            PhaseConfig::Tempering(c) => {
                stages.push(Stage {
                    kind: PhaseKind::Tempering,
                    boundary: tempering_boundary(c),
                    duration_s: c.duration_s(),
                    end_condition: c.end_condition,
                });
                stages.push(Stage {
                    kind: PhaseKind::CoolDown,
                    boundary: cooldown_boundary(&c.cool_down),
                    duration_s: c.cool_down.duration_s,
                    end_condition: c.cool_down.end_condition,
                });
            }
        }
    }
    stages
}

/// Where the cycle is, reported after every step and at stage boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleProgress {
    pub phase_index: usize,
    pub total_phases: usize,
    pub phase: PhaseKind,
    /// Elapsed share of the stage's maximum duration.
    pub phase_fraction: f64,
    /// `(phase_index + phase_fraction) / total_phases`
    pub overall_fraction: f64,
    /// Absolute cycle time [s].
    pub time_s: f64,
}

/// Callbacks and limits for one run.
#[derive(Default)]
pub struct RunHooks<'a> {
    pub progress: Option<&'a mut dyn FnMut(&CycleProgress)>,
    /// Polled before every solver step.
    pub cancelled: Option<&'a dyn Fn() -> bool>,
    pub deadline: Option<Instant>,
}

pub struct MultiPhaseOrchestrator {
    solver: ThermalSolver,
    material: MaterialModel,
    stages: Vec<Stage>,
    initial_c: f64,
}

impl MultiPhaseOrchestrator {
    /// Validate `config` and prepare the mesh, material and stages.
    pub fn new(config: &SimulationConfig) -> SimResult<Self> {
        validate_config(config)?;
        let material = config.material.resolve().map_err(ValidationError::from)?;
        let solver = ThermalSolver::for_geometry(&config.geometry, config.solver.clone())
            .map_err(ValidationError::from)?;
        Ok(Self {
            solver,
            material,
            stages: plan_stages(config),
            initial_c: config.start_temperature_c(),
        })
    }

    pub fn solver(&self) -> &ThermalSolver {
        &self.solver
    }

    pub fn material(&self) -> &MaterialModel {
        &self.material
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage. Each stage starts from the final field of the one
    /// before; the first from a uniform field at the start temperature.
    pub fn run(&self, mut hooks: RunHooks<'_>) -> Result<CycleResult, CycleFailure> {
        let total = self.stages.len();
        let dt_s = self.solver.settings().dt_s;
        let mut field = self.solver.uniform_field(self.initial_c);
        let mut clock = 0.0;
        let mut cycle = CycleResult::default();

        for (index, stage) in self.stages.iter().enumerate() {
            let report = |fraction: f64, time_s: f64| CycleProgress {
                phase_index: index,
                total_phases: total,
                phase: stage.kind,
                phase_fraction: fraction,
                overall_fraction: (index as f64 + fraction) / total as f64,
                time_s,
            };
            if let Some(cb) = hooks.progress.as_deref_mut() {
                cb(&report(0.0, clock));
            }
            debug!(
                phase = %stage.kind,
                boundary = stage.boundary.label(),
                max_duration_s = stage.duration_s,
                "stage starting"
            );

            let mut monitor = EndMonitor::new(stage.end_condition, stage.duration_s);
            let outcome = {
                let progress = &mut hooks.progress;
                let monitor = &mut monitor;
                let mut on_step = |view: &StepView<'_>| -> StepDecision {
                    if let Some(cb) = progress.as_deref_mut() {
                        let fraction = if stage.duration_s > 0.0 {
                            (view.time_s / stage.duration_s).min(1.0)
                        } else {
                            1.0
                        };
                        cb(&report(fraction, clock + view.time_s));
                    }
                    monitor.observe(view)
                };
                let control = PhaseControl {
                    dt_s,
                    max_duration_s: stage.duration_s,
                    on_step: Some(&mut on_step),
                    cancelled: hooks.cancelled,
                    deadline: hooks.deadline,
                };
                self.solver
                    .run_phase(&field, &self.material, stage.boundary.as_ref(), control)
            };

            let history = match outcome {
                Ok(history) => history,
                Err(source) => {
                    return Err(CycleFailure {
                        error: SimError::Phase {
                            phase: stage.kind,
                            source,
                        },
                        partial: cycle,
                    });
                }
            };

            let summary = PhaseSummary::from_history(stage.kind, clock, &history, monitor.outcome());
            info!(
                phase = %stage.kind,
                duration_s = summary.duration_s(),
                center_final_c = summary.center_final_c,
                surface_final_c = summary.surface_final_c,
                steps = summary.steps,
                "stage finished"
            );
            field.copy_from(history.final_field());
            clock = summary.end_time_s;
            cycle.phases.push(PhaseRun {
                phase: stage.kind,
                start_time_s: summary.start_time_s,
                history,
                summary,
            });
            if let Some(cb) = hooks.progress.as_deref_mut() {
                cb(&report(1.0, clock));
            }
        }
        Ok(cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ht_mesh::Geometry;
    use ht_project::{HeatingConfig, MaterialDef, TemperingConfig};

    fn config() -> SimulationConfig {
        SimulationConfig::new(
            "bar",
            Geometry::Cylinder {
                radius: 0.01,
                length: 0.1,
            },
            MaterialDef::Custom {
                model: MaterialModel::generic_steel(),
            },
        )
    }

    #[test]
    fn tempering_adds_a_cool_down_stage() {
        let mut cfg = config();
        if let Some(PhaseConfig::Tempering(t)) = cfg.phase_mut(PhaseKind::Tempering) {
            *t = TemperingConfig {
                enabled: true,
                ..TemperingConfig::default()
            };
        }
        let kinds: Vec<PhaseKind> = plan_stages(&cfg).iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PhaseKind::Heating,
                PhaseKind::Transfer,
                PhaseKind::Quenching,
                PhaseKind::Tempering,
                PhaseKind::CoolDown,
            ]
        );
    }

    #[test]
    fn quench_only_starts_from_initial_temperature() {
        let mut cfg = config();
        cfg.phases.retain(|p| p.kind() == PhaseKind::Quenching);
        cfg.initial_temperature_c = 860.0;
        cfg.solver.n_nodes = 11;
        cfg.solver.dt_s = 1.0;
        if let Some(PhaseConfig::Quenching(q)) = cfg.phase_mut(PhaseKind::Quenching) {
            q.duration_s = 20.0;
        }
        let orch = MultiPhaseOrchestrator::new(&cfg).unwrap();
        let cycle = orch.run(RunHooks::default()).unwrap();
        assert_eq!(cycle.phases.len(), 1);
        let s = &cycle.phases[0].summary;
        assert_eq!(s.center_start_c, 860.0);
        assert!(s.surface_final_c < s.center_final_c);
        assert!((cycle.duration_s() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn failure_keeps_completed_stages() {
        let mut cfg = config();
        cfg.solver.n_nodes = 11;
        cfg.solver.dt_s = 5.0;
        cfg.solver.max_steps_per_phase = 5;
        if let Some(PhaseConfig::Heating(h)) = cfg.phase_mut(PhaseKind::Heating) {
            *h = HeatingConfig {
                hold_s: 20.0,
                ..HeatingConfig::default()
            };
        }
        // Heating (4 steps) and transfer (2 steps) fit the budget, the
        // 300 s quench (60 steps) does not.
        let orch = MultiPhaseOrchestrator::new(&cfg).unwrap();
        let failure = orch.run(RunHooks::default()).unwrap_err();
        assert_eq!(failure.error.phase(), Some(PhaseKind::Quenching));
        assert!(failure.error.is_divergence());
        assert_eq!(failure.partial.phases.len(), 2);
        assert_eq!(failure.partial.phases[1].phase, PhaseKind::Transfer);
    }

    #[test]
    fn cancellation_is_reported_as_interrupt() {
        let mut cfg = config();
        cfg.solver.n_nodes = 11;
        let cancelled = || true;
        let hooks = RunHooks {
            cancelled: Some(&cancelled),
            ..RunHooks::default()
        };
        let failure = MultiPhaseOrchestrator::new(&cfg)
            .unwrap()
            .run(hooks)
            .unwrap_err();
        assert!(failure.error.is_interrupted());
        assert!(failure.partial.phases.is_empty());
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_one() {
        let mut cfg = config();
        cfg.solver.n_nodes = 11;
        cfg.solver.dt_s = 10.0;
        if let Some(PhaseConfig::Heating(h)) = cfg.phase_mut(PhaseKind::Heating) {
            h.hold_s = 100.0;
        }
        let mut seen = Vec::new();
        let mut record = |p: &CycleProgress| seen.push(p.overall_fraction);
        let hooks = RunHooks {
            progress: Some(&mut record),
            ..RunHooks::default()
        };
        MultiPhaseOrchestrator::new(&cfg).unwrap().run(hooks).unwrap();
        assert!(seen.windows(2).all(|w| w[1] >= w[0] - 1e-12));
        assert_eq!(seen.last().copied(), Some(1.0));
    }
}
