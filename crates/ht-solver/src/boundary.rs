//! Surface heat exchange seen by the solver.

use ht_core::c_to_k;
use ht_core::constants::STEFAN_BOLTZMANN;

/// Radiative exchange with a black sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Radiation {
    pub emissivity: f64,
    pub sink_c: f64,
}

/// Convection plus optional radiation at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceExchange {
    /// Convective coefficient [W/(m²·K)]
    pub htc: f64,
    pub ambient_c: f64,
    pub radiation: Option<Radiation>,
}

impl SurfaceExchange {
    pub fn convective(htc: f64, ambient_c: f64) -> Self {
        Self {
            htc,
            ambient_c,
            radiation: None,
        }
    }

    /// Outward flux `h(Ts − Ta) + εσ(Ts⁴ − Tr⁴)` [W/m²].
    pub fn heat_flux(&self, surface_c: f64) -> f64 {
        let mut q = self.htc * (surface_c - self.ambient_c);
        if let Some(rad) = self.radiation {
            let ts = c_to_k(surface_c);
            let tr = c_to_k(rad.sink_c);
            q += rad.emissivity * STEFAN_BOLTZMANN * (ts.powi(4) - tr.powi(4));
        }
        q
    }

    /// Radiative coefficient `εσ(Ts² + Tr²)(Ts + Tr)` linearised about `surface_c`.
    pub fn radiative_htc(&self, surface_c: f64) -> f64 {
        match self.radiation {
            Some(rad) => {
                let ts = c_to_k(surface_c).max(0.0);
                let tr = c_to_k(rad.sink_c).max(0.0);
                rad.emissivity * STEFAN_BOLTZMANN * (ts * ts + tr * tr) * (ts + tr)
            }
            None => 0.0,
        }
    }

    /// Combined `(h_eff, T_eff)` with `q ≈ h_eff (Ts − T_eff)`.
    pub fn linearized(&self, surface_c: f64) -> (f64, f64) {
        let h_rad = self.radiative_htc(surface_c);
        let h_eff = self.htc + h_rad;
        if h_eff <= 0.0 {
            return (0.0, self.ambient_c);
        }
        let sink = self.radiation.map_or(self.ambient_c, |r| r.sink_c);
        let t_eff = (self.htc * self.ambient_c + h_rad * sink) / h_eff;
        (h_eff, t_eff)
    }
}

/// Boundary policy for one phase, evaluated at each time step.
pub trait BoundaryModel: Send + Sync {
    /// Short label for logs.
    fn label(&self) -> &str;

    /// Ambient (furnace/media) temperature at phase time `t_s`.
    fn ambient_at(&self, t_s: f64) -> f64;

    /// Exchange at phase time `t_s` for a surface at `surface_c`.
    /// `material_emissivity` is used unless the phase overrides it.
    fn exchange(&self, t_s: f64, surface_c: f64, material_emissivity: f64) -> SurfaceExchange;
}

/// Constant ambient with fixed convection and optional radiation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvectiveBoundary {
    pub htc: f64,
    pub ambient_c: f64,
    /// `Some(None)` radiates with the material emissivity,
    /// `Some(Some(e))` with a fixed one, `None` disables radiation.
    pub radiation: Option<Option<f64>>,
}

impl ConvectiveBoundary {
    pub fn new(htc: f64, ambient_c: f64) -> Self {
        Self {
            htc,
            ambient_c,
            radiation: None,
        }
    }

    pub fn insulated() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn with_radiation(mut self, emissivity: Option<f64>) -> Self {
        self.radiation = Some(emissivity);
        self
    }
}

impl BoundaryModel for ConvectiveBoundary {
    fn label(&self) -> &str {
        "convective"
    }

    fn ambient_at(&self, _t_s: f64) -> f64 {
        self.ambient_c
    }

    fn exchange(&self, _t_s: f64, _surface_c: f64, material_emissivity: f64) -> SurfaceExchange {
        SurfaceExchange {
            htc: self.htc,
            ambient_c: self.ambient_c,
            radiation: self.radiation.map(|e| Radiation {
                emissivity: e.unwrap_or(material_emissivity),
                sink_c: self.ambient_c,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convective_flux_sign() {
        let ex = SurfaceExchange::convective(100.0, 25.0);
        assert_eq!(ex.heat_flux(125.0), 10_000.0);
        assert_eq!(ex.heat_flux(25.0), 0.0);
        assert_eq!(ex.linearized(500.0), (100.0, 25.0));
    }

    #[test]
    fn linearised_radiation_matches_exact_flux_at_point() {
        let ex = SurfaceExchange {
            htc: 25.0,
            ambient_c: 850.0,
            radiation: Some(Radiation {
                emissivity: 0.85,
                sink_c: 850.0,
            }),
        };
        let ts = 300.0;
        let (h, t_eff) = ex.linearized(ts);
        let q_lin = h * (ts - t_eff);
        let q = ex.heat_flux(ts);
        assert!((q_lin - q).abs() / q.abs() < 1e-12);
        assert!(q < 0.0, "a cold part in a hot furnace gains heat");
    }

    #[test]
    fn insulated_boundary_has_no_flux() {
        let b = ConvectiveBoundary::insulated();
        let ex = b.exchange(0.0, 900.0, 0.9);
        assert_eq!(ex.heat_flux(900.0), 0.0);
        assert_eq!(ex.linearized(900.0).0, 0.0);
    }
}
