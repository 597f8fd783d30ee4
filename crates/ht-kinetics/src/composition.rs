//! Chemical composition and the critical temperatures derived from it.

use serde::{Deserialize, Serialize};

use crate::error::{KineticsError, KineticsResult};

/// Alloy content in weight percent. Missing elements are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Composition {
    pub c: f64,
    pub mn: f64,
    pub si: f64,
    pub ni: f64,
    pub cr: f64,
    pub mo: f64,
    pub v: f64,
    pub w: f64,
    pub cu: f64,
    pub p: f64,
}

impl Composition {
    /// IIW carbon equivalent `C + Mn/6 + (Cr+Mo+V)/5 + (Ni+Cu)/15`.
    pub fn carbon_equivalent(&self) -> f64 {
        self.c + self.mn / 6.0 + (self.cr + self.mo + self.v) / 5.0 + (self.ni + self.cu) / 15.0
    }

    pub fn validate(&self) -> KineticsResult<()> {
        let elements = [
            ("composition.c", self.c),
            ("composition.mn", self.mn),
            ("composition.si", self.si),
            ("composition.ni", self.ni),
            ("composition.cr", self.cr),
            ("composition.mo", self.mo),
            ("composition.v", self.v),
            ("composition.w", self.w),
            ("composition.cu", self.cu),
            ("composition.p", self.p),
        ];
        for (what, value) in elements {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(KineticsError::InvalidParameter { what, value });
            }
        }
        // Beyond ~2.1 wt% carbon the alloy is cast iron.
        if self.c > 2.1 {
            return Err(KineticsError::InvalidParameter {
                what: "composition.c",
                value: self.c,
            });
        }
        Ok(())
    }
}

/// Transformation temperatures in °C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalTemperatures {
    pub ae1_c: f64,
    pub ae3_c: f64,
    pub bs_c: f64,
    pub ms_c: f64,
    pub mf_c: f64,
}

impl Default for CriticalTemperatures {
    fn default() -> Self {
        Self {
            ae1_c: 727.0,
            ae3_c: 900.0,
            bs_c: 550.0,
            ms_c: 350.0,
            mf_c: 135.0,
        }
    }
}

impl CriticalTemperatures {
    /// Andrews (Ae1, Ae3, Ms) and Steven–Haynes (Bs) correlations.
    pub fn from_composition(comp: &Composition) -> Self {
        let Composition {
            c,
            mn,
            si,
            ni,
            cr,
            mo,
            v,
            w,
            cu,
            p,
        } = *comp;
        let ae1_c = 727.0 - 10.7 * mn - 16.9 * ni + 29.1 * si + 16.9 * cr + 6.38 * w;
        let ae3_c = 910.0 - 203.0 * c.max(0.001).sqrt() - 15.2 * ni + 44.7 * si + 104.0 * v
            + 31.5 * mo
            + 13.1 * w
            - 30.0 * mn
            - 11.0 * cr
            - 20.0 * cu
            + 700.0 * p;
        let bs_c = 830.0 - 270.0 * c - 90.0 * mn - 37.0 * ni - 70.0 * cr - 83.0 * mo;
        let ms_c = 539.0 - 423.0 * c - 30.4 * mn - 17.7 * ni - 12.1 * cr - 7.5 * mo - 7.5 * si;
        Self {
            ae1_c,
            ae3_c,
            bs_c,
            ms_c,
            mf_c: (ms_c - 215.0).max(-50.0),
        }
    }

    pub fn validate(&self) -> KineticsResult<()> {
        let all = [
            ("ae1_c", self.ae1_c),
            ("ae3_c", self.ae3_c),
            ("bs_c", self.bs_c),
            ("ms_c", self.ms_c),
            ("mf_c", self.mf_c),
        ];
        for (what, value) in all {
            if !value.is_finite() {
                return Err(KineticsError::InvalidParameter { what, value });
            }
        }
        let order = [
            ("Ae1", self.ae1_c, "Ae3", self.ae3_c),
            ("Bs", self.bs_c, "Ae1", self.ae1_c),
            ("Ms", self.ms_c, "Bs", self.bs_c),
            ("Mf", self.mf_c, "Ms", self.ms_c),
        ];
        for (lo_name, lo, hi_name, hi) in order {
            if lo >= hi {
                return Err(KineticsError::CriticalOrder {
                    reason: format!("{lo_name} ({lo} °C) must be below {hi_name} ({hi} °C)"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aisi_4340() -> Composition {
        Composition {
            c: 0.40,
            mn: 0.70,
            si: 0.25,
            ni: 1.80,
            cr: 0.80,
            mo: 0.25,
            ..Composition::default()
        }
    }

    #[test]
    fn defaults_are_ordered() {
        let ct = CriticalTemperatures::default();
        ct.validate().unwrap();
        assert_eq!(ct.mf_c, 135.0);
    }

    #[test]
    fn andrews_for_4340() {
        let ct = CriticalTemperatures::from_composition(&aisi_4340());
        // Ms = 539 - 169.2 - 21.28 - 31.86 - 9.68 - 1.875 - 1.875
        assert!((ct.ms_c - 303.23).abs() < 0.01);
        assert!((ct.mf_c - (ct.ms_c - 215.0)).abs() < 1e-12);
        assert!(ct.ae3_c > ct.ae1_c);
        ct.validate().unwrap();
    }

    #[test]
    fn mf_is_floored() {
        let high_carbon = Composition {
            c: 1.2,
            mn: 0.5,
            ..Composition::default()
        };
        let ct = CriticalTemperatures::from_composition(&high_carbon);
        assert_eq!(ct.mf_c, -50.0);
    }

    #[test]
    fn out_of_order_is_reported() {
        let ct = CriticalTemperatures {
            ms_c: 600.0,
            ..CriticalTemperatures::default()
        };
        assert!(matches!(
            ct.validate(),
            Err(KineticsError::CriticalOrder { .. })
        ));
    }

    #[test]
    fn carbon_equivalent_iiw() {
        let ce = aisi_4340().carbon_equivalent();
        let expected = 0.40 + 0.70 / 6.0 + (0.80 + 0.25) / 5.0 + 1.80 / 15.0;
        assert!((ce - expected).abs() < 1e-12);
        assert!(Composition { c: 3.0, ..Composition::default() }.validate().is_err());
    }
}
