//! Transformation parameters for one steel grade.

use serde::{Deserialize, Serialize};

use crate::composition::{Composition, CriticalTemperatures};
use crate::error::{KineticsError, KineticsResult};
use crate::jmak::JmakParameters;

/// Koistinen–Marburger coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MartensiteParameters {
    /// α [1/K]
    pub alpha: f64,
}

impl Default for MartensiteParameters {
    fn default() -> Self {
        Self { alpha: 0.011 }
    }
}

impl MartensiteParameters {
    /// Fraction of the parent austenite transformed after undercooling
    /// `undercooling_c` below Ms.
    pub fn fraction(&self, undercooling_c: f64) -> f64 {
        if undercooling_c <= 0.0 {
            0.0
        } else {
            1.0 - (-self.alpha * undercooling_c).exp()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformationParameters {
    pub critical: CriticalTemperatures,
    /// ASTM E112 grain size number
    pub grain_size_astm: f64,
    pub composition: Option<Composition>,
    pub ferrite: Option<JmakParameters>,
    pub pearlite: Option<JmakParameters>,
    pub bainite: Option<JmakParameters>,
    pub martensite: MartensiteParameters,
    /// Hollomon–Jaffe constant C
    pub hollomon_jaffe_c: f64,
}

impl Default for TransformationParameters {
    fn default() -> Self {
        Self::with_kinetics(CriticalTemperatures::default(), None, 1.0)
    }
}

/// Reference grain size the rate coefficients are quoted for.
const REFERENCE_GRAIN_SIZE: f64 = 8.0;

impl TransformationParameters {
    /// Gaussian rate laws placed relative to the critical temperatures.
    /// `speed` scales every `b_max`; lower values mean a more hardenable steel.
    fn with_kinetics(
        critical: CriticalTemperatures,
        composition: Option<Composition>,
        speed: f64,
    ) -> Self {
        let CriticalTemperatures {
            ae1_c, bs_c, ms_c, ..
        } = critical;
        Self {
            critical,
            grain_size_astm: REFERENCE_GRAIN_SIZE,
            composition,
            ferrite: Some(JmakParameters::gaussian(2.0, 5e-3 * speed, ae1_c - 30.0, 50.0)),
            pearlite: Some(JmakParameters::gaussian(
                2.5,
                5e-4 * speed,
                0.5 * (ae1_c + bs_c),
                45.0,
            )),
            bainite: Some(JmakParameters::gaussian(
                2.0,
                2e-3 * speed,
                0.5 * (bs_c + ms_c),
                50.0,
            )),
            martensite: MartensiteParameters::default(),
            hollomon_jaffe_c: 20.0,
        }
    }

    /// Built-in parameter set for a catalog grade designation.
    pub fn for_grade(designation: &str) -> Option<Self> {
        let (composition, speed) = match designation.trim().to_ascii_lowercase().as_str() {
            "s355j2g3" => (
                Composition {
                    c: 0.18,
                    mn: 1.40,
                    si: 0.35,
                    ..Composition::default()
                },
                2.0,
            ),
            "aisi 4130" => (
                Composition {
                    c: 0.30,
                    mn: 0.50,
                    si: 0.25,
                    cr: 0.95,
                    mo: 0.20,
                    ..Composition::default()
                },
                0.2,
            ),
            "aisi 4340" => (
                Composition {
                    c: 0.40,
                    mn: 0.70,
                    si: 0.25,
                    ni: 1.80,
                    cr: 0.80,
                    mo: 0.25,
                    ..Composition::default()
                },
                0.02,
            ),
            _ => return None,
        };
        Some(Self::from_composition(composition, speed))
    }

    /// Critical temperatures from the composition, kinetics scaled by `speed`.
    pub fn from_composition(composition: Composition, speed: f64) -> Self {
        let critical = CriticalTemperatures::from_composition(&composition);
        Self::with_kinetics(critical, Some(composition), speed)
    }

    /// Rate multiplier for the configured grain size; finer grains (larger
    /// numbers) offer more nucleation sites.
    pub fn grain_factor(&self) -> f64 {
        2f64.powf((self.grain_size_astm - REFERENCE_GRAIN_SIZE) / 2.0)
    }

    pub fn validate(&self) -> KineticsResult<()> {
        self.critical.validate()?;
        if let Some(comp) = &self.composition {
            comp.validate()?;
        }
        if !self.grain_size_astm.is_finite() || !(0.0..=15.0).contains(&self.grain_size_astm) {
            return Err(KineticsError::InvalidParameter {
                what: "grain_size_astm",
                value: self.grain_size_astm,
            });
        }
        let alpha = self.martensite.alpha;
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(KineticsError::InvalidParameter {
                what: "martensite.alpha",
                value: alpha,
            });
        }
        let c = self.hollomon_jaffe_c;
        if !c.is_finite() || c <= 0.0 {
            return Err(KineticsError::InvalidParameter {
                what: "hollomon_jaffe_c",
                value: c,
            });
        }
        for (phase, jmak) in [
            ("ferrite", &self.ferrite),
            ("pearlite", &self.pearlite),
            ("bainite", &self.bainite),
        ] {
            if let Some(jmak) = jmak {
                jmak.validate(phase)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let params = TransformationParameters::default();
        params.validate().unwrap();
        assert_eq!(params.grain_factor(), 1.0);
        assert_eq!(params.critical.ae3_c, 900.0);
    }

    #[test]
    fn catalog_presets_validate() {
        for grade in ["S355J2G3", "AISI 4130", "aisi 4340"] {
            let params = TransformationParameters::for_grade(grade).unwrap();
            params.validate().unwrap();
            assert!(params.composition.is_some());
        }
        assert!(TransformationParameters::for_grade("unobtainium").is_none());
    }

    #[test]
    fn km_fraction() {
        let km = MartensiteParameters::default();
        assert_eq!(km.fraction(-5.0), 0.0);
        assert!((km.fraction(100.0) - (1.0 - (-1.1f64).exp())).abs() < 1e-15);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let params: TransformationParameters =
            serde_json::from_str(r#"{"grain_size_astm": 10.0, "bainite": null}"#).unwrap();
        assert!(params.bainite.is_none());
        assert!(params.ferrite.is_some());
        assert_eq!(params.grain_factor(), 2.0);
    }

    #[test]
    fn rejects_bad_alpha() {
        let mut params = TransformationParameters::default();
        params.martensite.alpha = 0.0;
        assert!(matches!(
            params.validate(),
            Err(KineticsError::InvalidParameter {
                what: "martensite.alpha",
                ..
            })
        ));
    }
}
