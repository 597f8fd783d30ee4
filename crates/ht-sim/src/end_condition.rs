//! Per-step stop policies for a stage.

use std::collections::VecDeque;

use ht_project::EndCondition;
use ht_solver::{StepDecision, StepView};
use serde::{Deserialize, Serialize};

/// Why a stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PhaseEnd {
    /// Ran for its full duration.
    Duration,
    /// Rate dropped below the threshold at `triggered_at_s`.
    RateThreshold { triggered_at_s: f64 },
    /// Spread and approach to ambient both fell within ε.
    Equilibrium { at_s: f64 },
}

/// Tracks one end condition across the steps of a stage.
#[derive(Debug)]
pub struct EndMonitor {
    condition: EndCondition,
    max_duration_s: f64,
    /// (time, reference temperature) inside the averaging window.
    samples: VecDeque<(f64, f64)>,
    armed: bool,
    ended: Option<PhaseEnd>,
}

impl EndMonitor {
    pub fn new(condition: EndCondition, max_duration_s: f64) -> Self {
        Self {
            condition,
            max_duration_s,
            samples: VecDeque::new(),
            armed: false,
            ended: None,
        }
    }

    /// How the stage ended; `Duration` unless a condition fired.
    pub fn outcome(&self) -> PhaseEnd {
        self.ended.unwrap_or(PhaseEnd::Duration)
    }

    pub fn observe(&mut self, view: &StepView<'_>) -> StepDecision {
        match self.condition {
            EndCondition::FixedDuration => StepDecision::Continue,
            EndCondition::Equilibrium { epsilon_c } => {
                let center = view.field[view.center_index];
                let surface = view.field[view.surface_index];
                let spread = (surface - center).abs();
                let approach = (center - view.ambient_c).abs();
                if spread < epsilon_c && approach < epsilon_c {
                    self.ended = Some(PhaseEnd::Equilibrium { at_s: view.time_s });
                    StepDecision::Stop
                } else {
                    StepDecision::Continue
                }
            }
            EndCondition::RateThreshold {
                threshold_c_per_hr,
                reference_offset,
                window_s,
                hold_after_trigger_s,
            } => {
                if let Some(PhaseEnd::RateThreshold { triggered_at_s }) = self.ended {
                    let release = (triggered_at_s + hold_after_trigger_s).min(self.max_duration_s);
                    return if view.time_s >= release - 1e-9 {
                        StepDecision::Stop
                    } else {
                        StepDecision::Continue
                    };
                }

                let reference = (view.center_index + reference_offset).min(view.surface_index);
                if self.samples.is_empty() {
                    self.samples
                        .push_back((view.time_s - view.dt_s, view.previous[reference]));
                }
                self.samples.push_back((view.time_s, view.field[reference]));
                while self.samples.len() > 2 && self.samples[1].0 <= view.time_s - window_s {
                    self.samples.pop_front();
                }
                let Some(&(t0, temp0)) = self.samples.front() else {
                    return StepDecision::Continue;
                };
                let elapsed = view.time_s - t0;
                if elapsed <= 0.0 {
                    return StepDecision::Continue;
                }
                let rate = (view.field[reference] - temp0).abs() / elapsed * 3600.0;
                if rate > threshold_c_per_hr {
                    self.armed = true;
                    StepDecision::Continue
                } else if self.armed {
                    self.ended = Some(PhaseEnd::RateThreshold {
                        triggered_at_s: view.time_s,
                    });
                    if hold_after_trigger_s <= 0.0 {
                        StepDecision::Stop
                    } else {
                        StepDecision::Continue
                    }
                } else {
                    StepDecision::Continue
                }
            }
        }
    }
}
