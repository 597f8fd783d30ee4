//! Material model queried by the thermal solver.

use serde::{Deserialize, Serialize};

use crate::error::{MaterialError, MaterialResult};
use crate::property::PropertyModel;

/// Property values at one temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalProperties {
    /// Thermal conductivity [W/(m·K)]
    pub k: f64,
    /// Specific heat [J/(kg·K)]
    pub cp: f64,
    /// Density [kg/m³]
    pub rho: f64,
    /// Total hemispherical emissivity [-]
    pub emissivity: f64,
}

impl ThermalProperties {
    /// Volumetric heat capacity ρ·cp [J/(m³·K)]
    pub fn rho_cp(&self) -> f64 {
        self.rho * self.cp
    }

    /// Thermal diffusivity k/(ρ·cp) [m²/s]
    pub fn diffusivity(&self) -> f64 {
        self.k / self.rho_cp()
    }
}

/// Temperature window over which a material must stay physical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingRange {
    pub min_c: f64,
    pub max_c: f64,
}

impl Default for OperatingRange {
    fn default() -> Self {
        Self {
            min_c: 0.0,
            max_c: 1200.0,
        }
    }
}

/// Named property set for one steel grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialModel {
    pub grade: String,
    pub conductivity: PropertyModel,
    pub specific_heat: PropertyModel,
    pub density: PropertyModel,
    #[serde(default = "default_emissivity")]
    pub emissivity: PropertyModel,
}

fn default_emissivity() -> PropertyModel {
    PropertyModel::constant(0.85)
}

impl MaterialModel {
    /// Constant-property material (k 40, cp 500, ρ 7850, ε 0.85 when defaulted).
    pub fn constant(grade: impl Into<String>, k: f64, cp: f64, rho: f64, emissivity: f64) -> Self {
        Self {
            grade: grade.into(),
            conductivity: PropertyModel::constant(k),
            specific_heat: PropertyModel::constant(cp),
            density: PropertyModel::constant(rho),
            emissivity: PropertyModel::constant(emissivity),
        }
    }

    /// Generic carbon steel used when no grade data is supplied.
    pub fn generic_steel() -> Self {
        Self::constant("generic steel", 40.0, 500.0, 7850.0, 0.85)
    }

    /// Evaluate every property at `t_c`, rejecting non-physical values.
    pub fn properties_at(&self, t_c: f64) -> MaterialResult<ThermalProperties> {
        let k = positive("conductivity", self.conductivity.evaluate(t_c), t_c)?;
        let cp = positive("specific_heat", self.specific_heat.evaluate(t_c), t_c)?;
        let rho = positive("density", self.density.evaluate(t_c), t_c)?;
        let emissivity = self.emissivity_at(t_c)?;
        Ok(ThermalProperties {
            k,
            cp,
            rho,
            emissivity,
        })
    }

    pub fn emissivity_at(&self, t_c: f64) -> MaterialResult<f64> {
        let eps = self.emissivity.evaluate(t_c);
        if eps.is_finite() && (0.0..=1.0).contains(&eps) {
            Ok(eps)
        } else {
            Err(MaterialError::NonPhysical {
                property: "emissivity",
                temperature_c: t_c,
                value: eps,
            })
        }
    }

    /// Check curve shapes and sample the range (every 10 °C plus the ends).
    pub fn validate(&self, range: OperatingRange) -> MaterialResult<()> {
        self.conductivity.check_shape("conductivity")?;
        self.specific_heat.check_shape("specific_heat")?;
        self.density.check_shape("density")?;
        self.emissivity.check_shape("emissivity")?;

        let span = (range.max_c - range.min_c).max(0.0);
        let samples = (span / 10.0).ceil() as usize;
        for i in 0..=samples {
            let t = (range.min_c + i as f64 * 10.0).min(range.max_c);
            self.properties_at(t)?;
        }
        Ok(())
    }
}

fn positive(property: &'static str, value: f64, t_c: f64) -> MaterialResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(MaterialError::NonPhysical {
            property,
            temperature_c: t_c,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expression;

    #[test]
    fn constant_material_properties() {
        let mat = MaterialModel::generic_steel();
        let p = mat.properties_at(500.0).unwrap();
        assert_eq!(p.k, 40.0);
        assert_eq!(p.rho_cp(), 7850.0 * 500.0);
        assert!((p.diffusivity() - 40.0 / (7850.0 * 500.0)).abs() < 1e-18);
        mat.validate(OperatingRange::default()).unwrap();
    }

    #[test]
    fn negative_conductivity_is_rejected_in_range() {
        let mut mat = MaterialModel::generic_steel();
        mat.conductivity = PropertyModel::Equation {
            expression: Expression::parse("40 - 0.05*T").unwrap(),
        };
        // 40 - 0.05*T crosses zero at 800 °C.
        assert!(mat.properties_at(700.0).is_ok());
        let err = mat.validate(OperatingRange::default()).unwrap_err();
        assert!(matches!(
            err,
            MaterialError::NonPhysical {
                property: "conductivity",
                ..
            }
        ));
    }

    #[test]
    fn emissivity_must_stay_in_unit_interval() {
        let mat = MaterialModel::constant("x", 40.0, 500.0, 7850.0, 1.2);
        assert!(matches!(
            mat.properties_at(20.0),
            Err(MaterialError::NonPhysical {
                property: "emissivity",
                ..
            })
        ));
    }

    #[test]
    fn missing_emissivity_defaults_when_deserialized() {
        let json = r#"{
            "grade": "plain",
            "conductivity": {"model": "constant", "value": 45.0},
            "specific_heat": {"model": "constant", "value": 480.0},
            "density": {"model": "constant", "value": 7850.0}
        }"#;
        let mat: MaterialModel = serde_json::from_str(json).unwrap();
        assert_eq!(mat.emissivity_at(300.0).unwrap(), 0.85);
    }
}
