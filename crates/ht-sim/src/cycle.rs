//! Results of a cycle: per-stage histories on one absolute clock.

use ht_core::cooling_time;
use ht_mesh::ProbeLocation;
use ht_project::PhaseKind;
use ht_solver::TemperatureHistory;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::end_condition::PhaseEnd;
use crate::error::SimError;

/// Headline numbers for one executed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub phase: PhaseKind,
    pub start_time_s: f64,
    pub end_time_s: f64,
    pub center_start_c: f64,
    pub center_final_c: f64,
    pub surface_start_c: f64,
    pub surface_final_c: f64,
    /// Center cooling time 800 → 500 °C within the stage.
    pub t_800_500_s: Option<f64>,
    /// Fastest center cooling over one step [°C/s]; 0 when it only heats.
    pub peak_cooling_rate_c_per_s: f64,
    pub ended_by: PhaseEnd,
    pub steps: usize,
    pub picard_iterations: usize,
}

impl PhaseSummary {
    pub(crate) fn from_history(
        phase: PhaseKind,
        start_time_s: f64,
        history: &TemperatureHistory,
        ended_by: PhaseEnd,
    ) -> Self {
        let times = history.step_times();
        let center = history.probe(ProbeLocation::Center).unwrap_or(&[]);
        let surface = history.probe(ProbeLocation::Surface).unwrap_or(&[]);
        let first = |s: &[f64]| s.first().copied().unwrap_or(f64::NAN);
        let last = |s: &[f64]| s.last().copied().unwrap_or(f64::NAN);
        let peak_cooling_rate_c_per_s = times
            .windows(2)
            .zip(center.windows(2))
            .filter(|(t, _)| t[1] > t[0])
            .map(|(t, c)| (c[0] - c[1]) / (t[1] - t[0]))
            .fold(0.0, f64::max);
        Self {
            phase,
            start_time_s,
            end_time_s: start_time_s + history.duration(),
            center_start_c: first(center),
            center_final_c: last(center),
            surface_start_c: first(surface),
            surface_final_c: last(surface),
            t_800_500_s: cooling_time(times, center, 800.0, 500.0),
            peak_cooling_rate_c_per_s,
            ended_by,
            steps: history.steps(),
            picard_iterations: history.picard_iterations(),
        }
    }

    pub fn duration_s(&self) -> f64 {
        self.end_time_s - self.start_time_s
    }
}

/// One executed stage.
#[derive(Debug, Clone)]
pub struct PhaseRun {
    pub phase: PhaseKind,
    /// Absolute start time in the cycle.
    pub start_time_s: f64,
    pub history: TemperatureHistory,
    pub summary: PhaseSummary,
}

/// Every stage that completed, in order.
#[derive(Debug, Clone, Default)]
pub struct CycleResult {
    pub phases: Vec<PhaseRun>,
}

impl CycleResult {
    pub fn phase(&self, kind: PhaseKind) -> Option<&PhaseRun> {
        self.phases.iter().find(|p| p.phase == kind)
    }

    pub fn summaries(&self) -> Vec<PhaseSummary> {
        self.phases.iter().map(|p| p.summary.clone()).collect()
    }

    pub fn duration_s(&self) -> f64 {
        self.phases.last().map_or(0.0, |p| p.summary.end_time_s)
    }

    pub fn final_field(&self) -> Option<&DVector<f64>> {
        self.phases.last().map(|p| p.history.final_field())
    }

    /// Per-step temperature at `location` over the whole cycle. The instant
    /// shared by consecutive stages appears once.
    pub fn probe_series(&self, location: ProbeLocation) -> (Vec<f64>, Vec<f64>) {
        let mut times = Vec::new();
        let mut temps = Vec::new();
        for (i, run) in self.phases.iter().enumerate() {
            let Some(series) = run.history.probe(location) else {
                continue;
            };
            let skip = usize::from(i > 0);
            for (t, v) in run.history.step_times().iter().zip(series).skip(skip) {
                times.push(run.start_time_s + t);
                temps.push(*v);
            }
        }
        (times, temps)
    }

    /// Recorded fields over the whole cycle on the absolute clock.
    pub fn recorded_fields(&self) -> (Vec<f64>, Vec<DVector<f64>>) {
        let mut times = Vec::new();
        let mut fields = Vec::new();
        for (i, run) in self.phases.iter().enumerate() {
            let skip = usize::from(i > 0);
            for (t, f) in run
                .history
                .times()
                .iter()
                .zip(run.history.fields())
                .skip(skip)
            {
                times.push(run.start_time_s + t);
                fields.push(f.clone());
            }
        }
        (times, fields)
    }
}

/// dT/dt between consecutive samples, stamped at the later sample [°C/s].
pub fn rate_series(times: &[f64], temps: &[f64]) -> (Vec<f64>, Vec<f64>) {
    times
        .windows(2)
        .zip(temps.windows(2))
        .filter(|(t, _)| t[1] > t[0])
        .map(|(t, v)| (t[1], (v[1] - v[0]) / (t[1] - t[0])))
        .unzip()
}

/// A failed cycle keeps the stages that finished before the failure.
#[derive(Debug)]
pub struct CycleFailure {
    pub error: SimError,
    pub partial: CycleResult,
}

impl std::fmt::Display for CycleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} stage(s) completed)",
            self.error,
            self.partial.phases.len()
        )
    }
}

impl std::error::Error for CycleFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
