//! Johnson–Mehl–Avrami–Kolmogorov isothermal kinetics `X = 1 − exp(−b(T)·tⁿ)`.

use ht_core::c_to_k;
use ht_core::constants::GAS_CONSTANT;
use serde::{Deserialize, Serialize};

use crate::error::{KineticsError, KineticsResult};

/// Largest `b·tⁿ` fed to `exp`; beyond it the extent is 1 to machine precision.
const MAX_EXPONENT: f64 = 700.0;

/// Extents closer to 1 than this are treated as complete.
const SATURATED: f64 = 1.0 - 1e-12;

/// Temperature dependence of the JMAK rate coefficient `b(T)` [1/sⁿ].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum RateModel {
    /// `b_max·exp(−½((T − T_nose)/σ)²)`
    Gaussian {
        b_max: f64,
        nose_c: f64,
        sigma_c: f64,
    },
    /// `b0·exp(−Q/(R·T_K))`, Q in J/mol.
    Arrhenius { b0: f64, activation_energy: f64 },
    /// `Σ aᵢ·Tⁱ`, clamped at zero.
    Polynomial { coefficients: Vec<f64> },
}

impl RateModel {
    pub fn rate(&self, t_c: f64) -> f64 {
        match self {
            RateModel::Gaussian {
                b_max,
                nose_c,
                sigma_c,
            } => {
                let z = (t_c - nose_c) / sigma_c;
                b_max * (-0.5 * z * z).exp()
            }
            RateModel::Arrhenius {
                b0,
                activation_energy,
            } => {
                let t_k = c_to_k(t_c);
                if t_k <= 0.0 {
                    0.0
                } else {
                    b0 * (-activation_energy / (GAS_CONSTANT * t_k)).exp()
                }
            }
            RateModel::Polynomial { coefficients } => coefficients
                .iter()
                .rev()
                .fold(0.0, |acc, a| acc * t_c + a)
                .max(0.0),
        }
    }

    fn validate(&self, phase: &'static str) -> KineticsResult<()> {
        let bad = |value: f64| KineticsError::InvalidParameter { what: phase, value };
        match self {
            RateModel::Gaussian {
                b_max,
                nose_c,
                sigma_c,
            } => {
                if !b_max.is_finite() || *b_max < 0.0 {
                    return Err(bad(*b_max));
                }
                if !nose_c.is_finite() {
                    return Err(bad(*nose_c));
                }
                if !sigma_c.is_finite() || *sigma_c <= 0.0 {
                    return Err(bad(*sigma_c));
                }
            }
            RateModel::Arrhenius {
                b0,
                activation_energy,
            } => {
                if !b0.is_finite() || *b0 < 0.0 {
                    return Err(bad(*b0));
                }
                if !activation_energy.is_finite() {
                    return Err(bad(*activation_energy));
                }
            }
            RateModel::Polynomial { coefficients } => {
                if coefficients.is_empty() {
                    return Err(bad(f64::NAN));
                }
                if let Some(c) = coefficients.iter().find(|c| !c.is_finite()) {
                    return Err(bad(*c));
                }
            }
        }
        Ok(())
    }
}

/// Avrami exponent plus rate law for one diffusive product phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JmakParameters {
    pub n: f64,
    pub rate: RateModel,
}

impl JmakParameters {
    pub fn gaussian(n: f64, b_max: f64, nose_c: f64, sigma_c: f64) -> Self {
        Self {
            n,
            rate: RateModel::Gaussian {
                b_max,
                nose_c,
                sigma_c,
            },
        }
    }

    /// Isothermal extent after `time_s` held at `t_c`.
    pub fn fraction(&self, time_s: f64, t_c: f64) -> f64 {
        extent(self.rate.rate(t_c), self.n, time_s)
    }

    /// Isothermal time needed to reach extent `x` at `t_c`; `None` when the
    /// rate vanishes or `x` is outside `[0, 1)`.
    pub fn time_to_fraction(&self, x: f64, t_c: f64) -> Option<f64> {
        virtual_time(self.rate.rate(t_c), self.n, x)
    }

    pub(crate) fn validate(&self, phase: &'static str) -> KineticsResult<()> {
        if !self.n.is_finite() || self.n <= 0.0 {
            return Err(KineticsError::InvalidParameter {
                what: phase,
                value: self.n,
            });
        }
        self.rate.validate(phase)
    }
}

pub(crate) fn extent(b: f64, n: f64, time_s: f64) -> f64 {
    if b <= 0.0 || time_s <= 0.0 {
        return 0.0;
    }
    let exponent = (b * time_s.powf(n)).min(MAX_EXPONENT);
    1.0 - (-exponent).exp()
}

pub(crate) fn virtual_time(b: f64, n: f64, x: f64) -> Option<f64> {
    if b <= 0.0 || !(0.0..SATURATED).contains(&x) {
        return None;
    }
    if x == 0.0 {
        return Some(0.0);
    }
    Some((-(1.0 - x).ln() / b).powf(1.0 / n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_peaks_at_nose() {
        let model = RateModel::Gaussian {
            b_max: 0.01,
            nose_c: 650.0,
            sigma_c: 50.0,
        };
        assert_eq!(model.rate(650.0), 0.01);
        let one_sigma = model.rate(700.0);
        assert!((one_sigma - 0.01 * (-0.5f64).exp()).abs() < 1e-15);
        assert_eq!(model.rate(600.0), one_sigma);
    }

    #[test]
    fn arrhenius_uses_kelvin() {
        let model = RateModel::Arrhenius {
            b0: 1.0e6,
            activation_energy: 150_000.0,
        };
        let t_k: f64 = 600.0 + 273.15;
        let expected = 1.0e6 * (-150_000.0 / (8.314 * t_k)).exp();
        assert!((model.rate(600.0) - expected).abs() < expected * 1e-12);
        assert_eq!(model.rate(-300.0), 0.0);
    }

    #[test]
    fn polynomial_is_clamped_non_negative() {
        let model = RateModel::Polynomial {
            coefficients: vec![1.0, -0.01],
        };
        assert!((model.rate(50.0) - 0.5).abs() < 1e-12);
        assert_eq!(model.rate(200.0), 0.0);
    }

    #[test]
    fn time_to_fraction_inverts_fraction() {
        let jmak = JmakParameters::gaussian(2.5, 1e-3, 600.0, 40.0);
        let t = jmak.time_to_fraction(0.5, 620.0).unwrap();
        assert!((jmak.fraction(t, 620.0) - 0.5).abs() < 1e-12);
        assert_eq!(jmak.time_to_fraction(0.0, 620.0), Some(0.0));
        assert_eq!(jmak.time_to_fraction(1.0, 620.0), None);
    }

    #[test]
    fn huge_exponent_saturates_without_overflow() {
        let jmak = JmakParameters::gaussian(4.0, 1.0, 600.0, 40.0);
        assert_eq!(jmak.fraction(1.0e6, 600.0), 1.0);
        assert_eq!(jmak.fraction(0.0, 600.0), 0.0);
    }

    #[test]
    fn rejects_bad_exponent() {
        let jmak = JmakParameters::gaussian(0.0, 1e-3, 600.0, 40.0);
        assert!(jmak.validate("ferrite").is_err());
        let jmak = JmakParameters::gaussian(2.0, 1e-3, 600.0, -1.0);
        assert!(jmak.validate("ferrite").is_err());
    }
}
