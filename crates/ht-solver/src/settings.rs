//! Discretization and integration settings.

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Odd node count, at least 11.
    pub n_nodes: usize,
    /// Time step [s]
    pub dt_s: f64,
    /// Implicitness: 1.0 backward Euler, 0.5 Crank–Nicolson.
    pub theta: f64,
    /// Picard iterations allowed per step before declaring divergence.
    pub max_iterations: usize,
    /// Picard convergence threshold on the largest nodal change [°C].
    pub tolerance_c: f64,
    /// Keep every N-th field in the history (the last field is always kept).
    pub record_every: usize,
    /// Step budget per phase.
    pub max_steps_per_phase: usize,
    /// Fields hotter than this are treated as divergence [°C].
    pub max_temperature_c: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            n_nodes: 51,
            dt_s: 0.5,
            theta: 1.0,
            max_iterations: 50,
            tolerance_c: 1e-4,
            record_every: 10,
            max_steps_per_phase: 2_000_000,
            max_temperature_c: 3000.0,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> SolverResult<()> {
        let bad = |what: &str| {
            Err(SolverError::Configuration {
                what: what.to_string(),
            })
        };
        if !(self.dt_s.is_finite() && self.dt_s > 0.0) {
            return bad("dt_s must be positive");
        }
        if !(0.5..=1.0).contains(&self.theta) {
            return bad("theta must lie in [0.5, 1.0]");
        }
        if self.max_iterations == 0 {
            return bad("max_iterations must be positive");
        }
        if !(self.tolerance_c.is_finite() && self.tolerance_c > 0.0) {
            return bad("tolerance_c must be positive");
        }
        if self.record_every == 0 {
            return bad("record_every must be positive");
        }
        if self.max_steps_per_phase == 0 {
            return bad("max_steps_per_phase must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = SolverSettings::default();
        assert_eq!(s.n_nodes, 51);
        assert_eq!(s.theta, 1.0);
        s.validate().unwrap();
    }

    #[test]
    fn explicit_theta_rejected() {
        let s = SolverSettings {
            theta: 0.0,
            ..SolverSettings::default()
        };
        assert!(matches!(
            s.validate(),
            Err(SolverError::Configuration { .. })
        ));
    }
}
