//! Boundary policy for each stage of the cycle.

use ht_project::{
    CoolDownConfig, FurnaceAtmosphere, FurnaceRamp, HeatingConfig, QuenchConfig, TemperingConfig,
    TransferConfig,
};
use ht_solver::{BoundaryModel, Radiation, SurfaceExchange};

/// Ambient temperature over the stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmbientSchedule {
    Constant(f64),
    /// `min(target, start + rate·t/60)`
    Ramp {
        start_c: f64,
        rate_c_per_min: f64,
        target_c: f64,
    },
}

impl AmbientSchedule {
    fn furnace(target_c: f64, ramp: Option<FurnaceRamp>) -> Self {
        match ramp {
            Some(r) => AmbientSchedule::Ramp {
                start_c: r.start_temperature_c,
                rate_c_per_min: r.rate_c_per_min,
                target_c,
            },
            None => AmbientSchedule::Constant(target_c),
        }
    }

    pub fn at(&self, t_s: f64) -> f64 {
        match *self {
            AmbientSchedule::Constant(t) => t,
            AmbientSchedule::Ramp {
                start_c,
                rate_c_per_min,
                target_c,
            } => (start_c + rate_c_per_min * t_s / 60.0).min(target_c),
        }
    }
}

/// Convection to the ambient plus optional radiation to the same sink.
#[derive(Debug, Clone, PartialEq)]
pub struct StageBoundary {
    label: &'static str,
    pub htc: f64,
    pub ambient: AmbientSchedule,
    /// `Some(None)` radiates with the material emissivity.
    pub radiation: Option<Option<f64>>,
}

impl BoundaryModel for StageBoundary {
    fn label(&self) -> &str {
        self.label
    }

    fn ambient_at(&self, t_s: f64) -> f64 {
        self.ambient.at(t_s)
    }

    fn exchange(&self, t_s: f64, _surface_c: f64, material_emissivity: f64) -> SurfaceExchange {
        let ambient_c = self.ambient.at(t_s);
        SurfaceExchange {
            htc: self.htc,
            ambient_c,
            radiation: self.radiation.map(|eps| Radiation {
                emissivity: eps.unwrap_or(material_emissivity),
                sink_c: ambient_c,
            }),
        }
    }
}

fn radiation(enabled: bool, emissivity: Option<f64>) -> Option<Option<f64>> {
    enabled.then_some(emissivity)
}

pub fn heating_boundary(cfg: &HeatingConfig) -> Box<dyn BoundaryModel> {
    let (htc, rad) = match cfg.atmosphere {
        FurnaceAtmosphere::Vacuum => (0.0, Some(cfg.emissivity)),
        FurnaceAtmosphere::Air | FurnaceAtmosphere::Inert | FurnaceAtmosphere::Protective => {
            (cfg.htc, radiation(cfg.use_radiation, cfg.emissivity))
        }
    };
    Box::new(StageBoundary {
        label: "heating",
        htc,
        ambient: AmbientSchedule::furnace(cfg.target_temperature_c, cfg.ramp),
        radiation: rad,
    })
}

pub fn transfer_boundary(cfg: &TransferConfig) -> Box<dyn BoundaryModel> {
    Box::new(StageBoundary {
        label: "transfer",
        htc: cfg.htc,
        ambient: AmbientSchedule::Constant(cfg.ambient_temperature_c),
        radiation: radiation(cfg.use_radiation, cfg.emissivity),
    })
}

pub fn quench_boundary(cfg: &QuenchConfig) -> Box<dyn BoundaryModel> {
    Box::new(StageBoundary {
        label: "quenching",
        htc: cfg.effective_htc(),
        ambient: AmbientSchedule::Constant(cfg.media_temperature_c),
        radiation: radiation(cfg.use_radiation, Some(cfg.emissivity)),
    })
}

pub fn tempering_boundary(cfg: &TemperingConfig) -> Box<dyn BoundaryModel> {
    Box::new(StageBoundary {
        label: "tempering",
        htc: cfg.htc,
        ambient: AmbientSchedule::furnace(cfg.temperature_c, cfg.ramp),
        radiation: radiation(cfg.use_radiation, cfg.emissivity),
    })
}

/// Still-air cool after tempering; radiates with the material emissivity.
pub fn cooldown_boundary(cfg: &CoolDownConfig) -> Box<dyn BoundaryModel> {
    Box::new(StageBoundary {
        label: "cool_down",
        htc: cfg.htc,
        ambient: AmbientSchedule::Constant(cfg.ambient_temperature_c),
        radiation: Some(None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ht_project::{Agitation, QuenchMedia};

    #[test]
    fn quench_htc_is_media_times_agitation() {
        let cfg = QuenchConfig {
            media: QuenchMedia::Oil,
            agitation: Agitation::Violent,
            ..QuenchConfig::default()
        };
        let b = quench_boundary(&cfg);
        let ex = b.exchange(0.0, 800.0, 0.9);
        assert_eq!(ex.htc, 2000.0);
        assert_eq!(ex.ambient_c, 25.0);
        assert!(ex.radiation.is_none());

        let overridden = QuenchConfig {
            htc_override: Some(1234.0),
            use_radiation: true,
            ..cfg
        };
        let ex = quench_boundary(&overridden).exchange(0.0, 800.0, 0.9);
        assert_eq!(ex.htc, 1234.0);
        assert_eq!(ex.radiation.map(|r| r.emissivity), Some(0.3));
    }

    #[test]
    fn furnace_ramp_caps_at_target() {
        let cfg = HeatingConfig {
            ramp: Some(FurnaceRamp {
                start_temperature_c: 25.0,
                rate_c_per_min: 10.0,
            }),
            ..HeatingConfig::default()
        };
        let b = heating_boundary(&cfg);
        assert_eq!(b.ambient_at(0.0), 25.0);
        assert_eq!(b.ambient_at(600.0), 125.0);
        assert_eq!(b.ambient_at(1.0e6), 850.0);
        assert_eq!(cfg.duration_s(), 82.5 * 60.0 + 3600.0);
    }

    #[test]
    fn vacuum_furnace_radiates_only() {
        let cfg = HeatingConfig {
            atmosphere: FurnaceAtmosphere::Vacuum,
            use_radiation: false,
            ..HeatingConfig::default()
        };
        let ex = heating_boundary(&cfg).exchange(0.0, 400.0, 0.7);
        assert_eq!(ex.htc, 0.0);
        assert_eq!(ex.radiation.map(|r| r.emissivity), Some(0.7));
        assert_eq!(ex.radiation.map(|r| r.sink_c), Some(850.0));
    }

    #[test]
    fn phase_emissivity_overrides_material() {
        let cfg = TransferConfig {
            emissivity: Some(0.5),
            ..TransferConfig::default()
        };
        let ex = transfer_boundary(&cfg).exchange(3.0, 800.0, 0.9);
        assert_eq!(ex.radiation.map(|r| r.emissivity), Some(0.5));
        let off = TransferConfig {
            use_radiation: false,
            ..TransferConfig::default()
        };
        assert!(transfer_boundary(&off).exchange(3.0, 800.0, 0.9).radiation.is_none());
    }
}
