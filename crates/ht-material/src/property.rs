//! Property models: one scalar property as a function of temperature.

use ht_core::interp_clamped;
use serde::{Deserialize, Serialize};

use crate::error::{MaterialError, MaterialResult};
use crate::expr::Expression;

/// How a property varies with temperature (°C).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum PropertyModel {
    Constant {
        value: f64,
    },
    /// Tabulated curve, linear between points and held at the end values.
    Curve {
        temperatures: Vec<f64>,
        values: Vec<f64>,
    },
    /// `a0 + a1·T + a2·T² + …`
    Polynomial {
        coefficients: Vec<f64>,
    },
    Equation {
        expression: Expression,
    },
}

impl PropertyModel {
    pub fn constant(value: f64) -> Self {
        PropertyModel::Constant { value }
    }

    pub fn curve(temperatures: Vec<f64>, values: Vec<f64>) -> Self {
        PropertyModel::Curve {
            temperatures,
            values,
        }
    }

    pub fn is_temperature_dependent(&self) -> bool {
        !matches!(self, PropertyModel::Constant { .. })
    }

    /// Structural checks that do not depend on the evaluation temperature.
    pub fn check_shape(&self, property: &'static str) -> MaterialResult<()> {
        match self {
            PropertyModel::Curve {
                temperatures,
                values,
            } => {
                if temperatures.is_empty() {
                    return Err(MaterialError::InvalidCurve {
                        property,
                        reason: "no points".to_string(),
                    });
                }
                if temperatures.len() != values.len() {
                    return Err(MaterialError::InvalidCurve {
                        property,
                        reason: format!(
                            "{} temperatures but {} values",
                            temperatures.len(),
                            values.len()
                        ),
                    });
                }
                if temperatures.windows(2).any(|w| w[1] <= w[0]) {
                    return Err(MaterialError::InvalidCurve {
                        property,
                        reason: "temperatures must be strictly increasing".to_string(),
                    });
                }
                Ok(())
            }
            PropertyModel::Polynomial { coefficients } if coefficients.is_empty() => {
                Err(MaterialError::InvalidCurve {
                    property,
                    reason: "no polynomial coefficients".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Raw value at `t_c`; may be non-finite for a badly posed equation.
    pub fn evaluate(&self, t_c: f64) -> f64 {
        match self {
            PropertyModel::Constant { value } => *value,
            PropertyModel::Curve {
                temperatures,
                values,
            } => interp_clamped(temperatures, values, t_c).unwrap_or(f64::NAN),
            PropertyModel::Polynomial { coefficients } => coefficients
                .iter()
                .rev()
                .fold(0.0, |acc, a| acc * t_c + a),
            PropertyModel::Equation { expression } => expression.eval(t_c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_interpolates_and_holds_edges() {
        let k = PropertyModel::curve(vec![20.0, 100.0, 200.0], vec![53.0, 51.0, 49.0]);
        k.check_shape("k").unwrap();
        assert_eq!(k.evaluate(-20.0), 53.0);
        assert_eq!(k.evaluate(1000.0), 49.0);
        assert!((k.evaluate(60.0) - 52.0).abs() < 1e-12);
    }

    #[test]
    fn polynomial_uses_horner() {
        let p = PropertyModel::Polynomial {
            coefficients: vec![20.0, 0.05, 0.00005],
        };
        let t = 400.0;
        let expected = 20.0 + 0.05 * t + 0.00005 * t * t;
        assert!((p.evaluate(t) - expected).abs() < 1e-9);
    }

    #[test]
    fn curve_shape_errors() {
        let mismatched = PropertyModel::curve(vec![20.0, 100.0], vec![1.0]);
        assert!(matches!(
            mismatched.check_shape("cp"),
            Err(MaterialError::InvalidCurve { property: "cp", .. })
        ));
        let descending = PropertyModel::curve(vec![100.0, 20.0], vec![1.0, 2.0]);
        assert!(descending.check_shape("cp").is_err());
        let empty = PropertyModel::Polynomial {
            coefficients: vec![],
        };
        assert!(empty.check_shape("k").is_err());
    }

    #[test]
    fn deserializes_tagged_models() {
        let yaml = "model: equation\nexpression: \"42.5 - 0.015*T\"\n";
        let model: PropertyModel = serde_yaml::from_str(yaml).unwrap();
        assert!((model.evaluate(100.0) - 41.0).abs() < 1e-12);
        assert!(model.is_temperature_dependent());

        let bad = "model: equation\nexpression: \"42.5 - \"\n";
        assert!(serde_yaml::from_str::<PropertyModel>(bad).is_err());
    }
}
