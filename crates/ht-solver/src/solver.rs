//! Finite-volume θ-scheme for `ρ·cp·∂T/∂t = ∇·(k·∇T)`.
//!
//! Each step solves
//!
//! ```text
//! Cᵢ (Tᵢⁿ⁺¹ − Tᵢⁿ) = θ Rᵢ(Tⁿ⁺¹) + (1 − θ) Rᵢ(Tⁿ)
//! Rᵢ(T) = Σ G_f (T_j − Tᵢ) − Hᵢ (Tᵢ − T_eff)
//! ```
//!
//! with `Cᵢ = ρcp Vᵢ / Δt`, face conductances `G_f = k_f A_f / Δx` (harmonic
//! mean of the neighbouring k) and surface conductance `H = h_eff A`. Properties
//! and the radiative coefficient are evaluated at the θ-weighted temperature
//! and refreshed by Picard iteration until the largest nodal change drops
//! below the tolerance. The same `G_f` enters both neighbours' equations, so
//! with `H = 0` the scheme conserves Σ Cᵢ Tᵢ exactly.

use std::time::Instant;

use ht_core::constants::ABSOLUTE_ZERO_C;
use ht_material::MaterialModel;
use ht_mesh::{Geometry, Mesh, ProbeLocation, discretize};
use nalgebra::DVector;
use tracing::{debug, warn};

use crate::boundary::BoundaryModel;
use crate::error::{SolverError, SolverResult};
use crate::history::TemperatureHistory;
use crate::settings::SolverSettings;
use crate::tridiag;

/// Returned by the per-step callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDecision {
    Continue,
    Stop,
}

/// State handed to the per-step callback after each accepted step.
#[derive(Debug)]
pub struct StepView<'a> {
    pub step: usize,
    /// Phase-relative time at the end of the step.
    pub time_s: f64,
    pub dt_s: f64,
    pub field: &'a DVector<f64>,
    pub previous: &'a DVector<f64>,
    pub ambient_c: f64,
    pub center_index: usize,
    pub surface_index: usize,
}

/// How long to integrate and when to stop or give up.
pub struct PhaseControl<'a> {
    pub dt_s: f64,
    pub max_duration_s: f64,
    pub on_step: Option<&'a mut dyn FnMut(&StepView<'_>) -> StepDecision>,
    /// Polled before every step.
    pub cancelled: Option<&'a dyn Fn() -> bool>,
    /// Wall-clock budget; exceeding it counts as divergence.
    pub deadline: Option<Instant>,
}

impl PhaseControl<'_> {
    pub fn fixed(dt_s: f64, duration_s: f64) -> Self {
        Self {
            dt_s,
            max_duration_s: duration_s,
            on_step: None,
            cancelled: None,
            deadline: None,
        }
    }
}

pub struct ThermalSolver {
    mesh: Mesh,
    settings: SolverSettings,
    probes: Vec<(ProbeLocation, usize)>,
}

impl ThermalSolver {
    pub fn new(mesh: Mesh, settings: SolverSettings) -> SolverResult<Self> {
        settings.validate()?;
        let probes = ProbeLocation::ALL
            .iter()
            .map(|loc| (*loc, mesh.probe_index(*loc)))
            .collect();
        Ok(Self {
            mesh,
            settings,
            probes,
        })
    }

    /// Discretize `geometry` with `settings.n_nodes` and build a solver.
    pub fn for_geometry(geometry: &Geometry, settings: SolverSettings) -> SolverResult<Self> {
        let mesh = discretize(geometry, settings.n_nodes)?;
        Self::new(mesh, settings)
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn uniform_field(&self, t_c: f64) -> DVector<f64> {
        DVector::from_element(self.mesh.n_nodes(), t_c)
    }

    /// Stored heat Σ Vᵢ ρᵢ cpᵢ Tᵢ [J] relative to 0 °C.
    pub fn stored_heat(&self, field: &DVector<f64>, material: &MaterialModel) -> SolverResult<f64> {
        let weights = field
            .iter()
            .map(|t| material.properties_at(*t).map(|p| p.rho_cp()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.mesh.volume_weighted_sum(field.as_slice(), &weights)?)
    }

    /// Integrate a fixed `duration_s` with step `dt_s`.
    pub fn solve_phase(
        &self,
        initial: &DVector<f64>,
        material: &MaterialModel,
        boundary: &dyn BoundaryModel,
        dt_s: f64,
        duration_s: f64,
    ) -> SolverResult<TemperatureHistory> {
        self.run_phase(
            initial,
            material,
            boundary,
            PhaseControl::fixed(dt_s, duration_s),
        )
    }

    /// Integrate until `max_duration_s` or until `on_step` asks to stop.
    pub fn run_phase(
        &self,
        initial: &DVector<f64>,
        material: &MaterialModel,
        boundary: &dyn BoundaryModel,
        mut control: PhaseControl<'_>,
    ) -> SolverResult<TemperatureHistory> {
        let n = self.mesh.n_nodes();
        if initial.len() != n {
            return Err(SolverError::FieldLength {
                expected: n,
                got: initial.len(),
            });
        }
        if let Some(bad) = initial.iter().find(|t| !t.is_finite()) {
            return Err(SolverError::Configuration {
                what: format!("initial temperature {bad} is not finite"),
            });
        }
        let dt = control.dt_s;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SolverError::Configuration {
                what: format!("time step must be positive, got {dt}"),
            });
        }
        let duration = control.max_duration_s;
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(SolverError::Configuration {
                what: format!("phase duration must be non-negative, got {duration}"),
            });
        }

        let mut history = TemperatureHistory::start(initial, &self.probes);
        let mut field = initial.clone();
        let mut t = 0.0;
        let mut step = 0usize;
        let slack = 1e-9 * dt;

        while t < duration - slack {
            if control.cancelled.is_some_and(|f| f()) {
                debug!(boundary = boundary.label(), time_s = t, "phase interrupted");
                return Err(SolverError::Interrupted { time_s: t });
            }
            if step >= self.settings.max_steps_per_phase {
                return Err(SolverError::Divergence {
                    what: format!(
                        "step budget of {} steps exceeded",
                        self.settings.max_steps_per_phase
                    ),
                    step,
                    time_s: t,
                });
            }
            if control.deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(SolverError::Divergence {
                    what: "wall-clock budget exceeded".to_string(),
                    step,
                    time_s: t,
                });
            }

            let dt_step = dt.min(duration - t);
            let t_new = t + dt_step;
            let (next, iterations) =
                self.advance(&field, t_new, dt_step, material, boundary, step + 1)?;
            step += 1;
            history.picard_iterations += iterations;
            let record = step % self.settings.record_every == 0;
            history.push_step(t_new, &next, &self.probes, record);

            let decision = match control.on_step.as_deref_mut() {
                Some(cb) => cb(&StepView {
                    step,
                    time_s: t_new,
                    dt_s: dt_step,
                    field: &next,
                    previous: &field,
                    ambient_c: boundary.ambient_at(t_new),
                    center_index: self.mesh.center_index(),
                    surface_index: self.mesh.surface_index(),
                }),
                None => StepDecision::Continue,
            };
            field = next;
            t = t_new;
            if decision == StepDecision::Stop {
                break;
            }
        }

        history.seal();
        debug!(
            boundary = boundary.label(),
            steps = history.steps(),
            duration_s = history.duration(),
            picard_iterations = history.picard_iterations(),
            "phase integrated"
        );
        Ok(history)
    }

    /// One implicit step with Picard iteration. Returns the new field and
    /// the iterations used.
    fn advance(
        &self,
        old: &DVector<f64>,
        t_new: f64,
        dt: f64,
        material: &MaterialModel,
        boundary: &dyn BoundaryModel,
        step: usize,
    ) -> SolverResult<(DVector<f64>, usize)> {
        let n = self.mesh.n_nodes();
        let theta = self.settings.theta;
        let dx = self.mesh.spacing();
        let volumes = self.mesh.volumes();
        let face_areas = self.mesh.face_areas();
        let surface = self.mesh.surface_index();
        let inner_area = self.mesh.inner_area();

        let mut k = vec![0.0; n];
        let mut cap = vec![0.0; n];
        let mut g = vec![0.0; n - 1];
        let mut h_node = vec![0.0; n];
        let mut t_sink = vec![0.0; n];
        let mut lower = vec![0.0; n];
        let mut diag = vec![0.0; n];
        let mut upper = vec![0.0; n];
        let mut rhs = vec![0.0; n];

        let mut iterate = old.clone();
        let mut last_change = f64::INFINITY;

        for iteration in 1..=self.settings.max_iterations {
            for i in 0..n {
                let t_eval = theta * iterate[i] + (1.0 - theta) * old[i];
                let props = material.properties_at(t_eval)?;
                k[i] = props.k;
                cap[i] = props.rho_cp() * volumes[i] / dt;
            }
            for j in 0..n - 1 {
                let k_face = 2.0 * k[j] * k[j + 1] / (k[j] + k[j + 1]);
                g[j] = k_face * face_areas[j] / dx;
            }

            h_node.iter_mut().for_each(|h| *h = 0.0);
            let mut exposed = vec![(surface, self.mesh.outer_area())];
            if inner_area > 0.0 {
                exposed.push((0, inner_area));
            }
            for (node, area) in exposed {
                let ts = theta * iterate[node] + (1.0 - theta) * old[node];
                let eps = material.emissivity_at(ts)?;
                let (h, sink) = boundary.exchange(t_new, ts, eps).linearized(ts);
                h_node[node] = h * area;
                t_sink[node] = sink;
            }

            for i in 0..n {
                let g_left = if i > 0 { g[i - 1] } else { 0.0 };
                let g_right = if i + 1 < n { g[i] } else { 0.0 };
                let mut residual_old = -h_node[i] * (old[i] - t_sink[i]);
                if i > 0 {
                    residual_old += g_left * (old[i - 1] - old[i]);
                }
                if i + 1 < n {
                    residual_old += g_right * (old[i + 1] - old[i]);
                }
                lower[i] = -theta * g_left;
                upper[i] = -theta * g_right;
                diag[i] = cap[i] + theta * (g_left + g_right + h_node[i]);
                rhs[i] = cap[i] * old[i]
                    + (1.0 - theta) * residual_old
                    + theta * h_node[i] * t_sink[i];
            }

            let next = tridiag::solve(&lower, &diag, &upper, &rhs).ok_or_else(|| {
                SolverError::Divergence {
                    what: "singular conduction matrix".to_string(),
                    step,
                    time_s: t_new,
                }
            })?;
            self.check_bounded(&next, step, t_new)?;

            last_change = next
                .iter()
                .zip(iterate.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            iterate = next;
            if last_change < self.settings.tolerance_c {
                return Ok((iterate, iteration));
            }
        }

        warn!(
            step,
            time_s = t_new,
            last_change,
            "Picard iteration did not converge"
        );
        Err(SolverError::Divergence {
            what: format!(
                "Picard iteration did not converge in {} iterations (last change {last_change:.3e} °C)",
                self.settings.max_iterations
            ),
            step,
            time_s: t_new,
        })
    }

    fn check_bounded(&self, field: &DVector<f64>, step: usize, time_s: f64) -> SolverResult<()> {
        let max_t = self.settings.max_temperature_c;
        match field
            .iter()
            .find(|t| !t.is_finite() || **t < ABSOLUTE_ZERO_C || **t > max_t)
        {
            Some(bad) => Err(SolverError::Divergence {
                what: format!("non-physical temperature {bad} °C"),
                step,
                time_s,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::ConvectiveBoundary;

    fn solver(n: usize) -> ThermalSolver {
        let g = Geometry::Cylinder {
            radius: 0.025,
            length: 0.1,
        };
        ThermalSolver::for_geometry(
            &g,
            SolverSettings {
                n_nodes: n,
                dt_s: 0.5,
                ..SolverSettings::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn uniform_field_at_ambient_stays_put() {
        let s = solver(11);
        let mat = MaterialModel::generic_steel();
        let t0 = s.uniform_field(25.0);
        let b = ConvectiveBoundary::new(500.0, 25.0);
        let hist = s.solve_phase(&t0, &mat, &b, 0.5, 10.0).unwrap();
        for t in hist.final_field().iter() {
            assert!((t - 25.0).abs() < 1e-9);
        }
        assert_eq!(hist.steps(), 20);
    }

    #[test]
    fn final_partial_step_hits_duration() {
        let s = solver(11);
        let mat = MaterialModel::generic_steel();
        let t0 = s.uniform_field(800.0);
        let b = ConvectiveBoundary::new(1000.0, 25.0);
        let hist = s.solve_phase(&t0, &mat, &b, 0.4, 1.0).unwrap();
        assert_eq!(hist.steps(), 3);
        assert!((hist.duration() - 1.0).abs() < 1e-12);
        assert_eq!(hist.times().last().copied(), Some(hist.duration()));
    }

    #[test]
    fn rejects_wrong_field_length() {
        let s = solver(11);
        let mat = MaterialModel::generic_steel();
        let b = ConvectiveBoundary::insulated();
        let err = s
            .solve_phase(&DVector::from_element(9, 20.0), &mat, &b, 0.5, 1.0)
            .unwrap_err();
        assert_eq!(
            err,
            SolverError::FieldLength {
                expected: 11,
                got: 9
            }
        );
        assert!(err.is_material());
    }

    #[test]
    fn negative_conductivity_is_material_error() {
        let s = solver(11);
        let mat = MaterialModel::constant("bad", -1.0, 500.0, 7850.0, 0.8);
        let b = ConvectiveBoundary::insulated();
        let err = s
            .solve_phase(&s.uniform_field(100.0), &mat, &b, 0.5, 1.0)
            .unwrap_err();
        assert!(matches!(err, SolverError::Material(_)));
    }

    #[test]
    fn cancel_flag_interrupts_before_first_step() {
        let s = solver(11);
        let mat = MaterialModel::generic_steel();
        let b = ConvectiveBoundary::new(100.0, 25.0);
        let cancel = || true;
        let control = PhaseControl {
            cancelled: Some(&cancel),
            ..PhaseControl::fixed(0.5, 10.0)
        };
        let err = s
            .run_phase(&s.uniform_field(800.0), &mat, &b, control)
            .unwrap_err();
        assert_eq!(err, SolverError::Interrupted { time_s: 0.0 });
    }

    #[test]
    fn step_budget_exceeded_is_divergence() {
        let g = Geometry::Cylinder {
            radius: 0.025,
            length: 0.1,
        };
        let s = ThermalSolver::for_geometry(
            &g,
            SolverSettings {
                n_nodes: 11,
                max_steps_per_phase: 5,
                ..SolverSettings::default()
            },
        )
        .unwrap();
        let mat = MaterialModel::generic_steel();
        let b = ConvectiveBoundary::new(100.0, 25.0);
        let err = s
            .solve_phase(&s.uniform_field(800.0), &mat, &b, 0.5, 10.0)
            .unwrap_err();
        assert!(matches!(err, SolverError::Divergence { step: 5, .. }));
    }

    #[test]
    fn on_step_can_stop_early() {
        let s = solver(11);
        let mat = MaterialModel::generic_steel();
        let b = ConvectiveBoundary::new(3000.0, 25.0);
        let mut stop_below = |view: &StepView<'_>| {
            if view.field[view.center_index] < 700.0 {
                StepDecision::Stop
            } else {
                StepDecision::Continue
            }
        };
        let control = PhaseControl {
            on_step: Some(&mut stop_below),
            ..PhaseControl::fixed(0.5, 600.0)
        };
        let hist = s
            .run_phase(&s.uniform_field(850.0), &mat, &b, control)
            .unwrap();
        assert!(hist.duration() < 600.0);
        let center = hist.probe(ProbeLocation::Center).unwrap();
        assert!(*center.last().unwrap() < 700.0);
        assert!(center[center.len() - 2] >= 700.0);
    }

    #[test]
    fn heating_with_radiation_approaches_furnace() {
        let s = solver(21);
        let mat = MaterialModel::generic_steel();
        let furnace = ConvectiveBoundary::new(25.0, 850.0).with_radiation(None);
        let hist = s
            .solve_phase(&s.uniform_field(25.0), &mat, &furnace, 1.0, 3600.0)
            .unwrap();
        let center = hist.probe(ProbeLocation::Center).unwrap();
        assert!(*center.last().unwrap() > 840.0);
        assert!(hist.final_field().iter().all(|t| *t <= 850.0 + 1e-6));
    }
}
