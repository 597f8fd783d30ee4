//! Hardness and mechanical property estimates from a predicted microstructure.

use serde::{Deserialize, Serialize};

use crate::additivity::PhaseFractions;
use crate::composition::Composition;

/// t8/5 assumed when the cooling path never spans 800 → 500 °C.
pub const FALLBACK_T_800_500_S: f64 = 10.0;

const RETAINED_AUSTENITE_HV: f64 = 200.0;

/// Hardness of each constituent [HV].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseHardness {
    pub martensite: f64,
    pub bainite: f64,
    pub ferrite_pearlite: f64,
    pub retained_austenite: f64,
}

impl Default for PhaseHardness {
    fn default() -> Self {
        Self {
            martensite: 700.0,
            bainite: 350.0,
            ferrite_pearlite: 200.0,
            retained_austenite: RETAINED_AUSTENITE_HV,
        }
    }
}

impl PhaseHardness {
    /// Maynier-style constituent hardness for `comp` at the given t8/5.
    /// Without a composition the default constants are used.
    pub fn estimate(comp: Option<&Composition>, t_800_500_s: Option<f64>) -> Self {
        let Some(comp) = comp else {
            return Self::default().with_monotonic_martensite();
        };
        let t85 = t_800_500_s.unwrap_or(FALLBACK_T_800_500_S).max(0.1);
        let vr = 300.0 / t85;
        let log_vr = vr.log10();

        let martensite = 127.0
            + 949.0 * comp.c
            + 27.0 * comp.si
            + 11.0 * comp.mn
            + 8.0 * comp.ni
            + 16.0 * comp.cr
            + 21.0 * log_vr;
        let bainite = 200.0
            + 500.0 * comp.c
            + 30.0 * comp.si
            + 20.0 * comp.mn
            + 10.0 * comp.ni
            + 30.0 * comp.cr
            + 50.0 * comp.mo
            - 5.0 * t85.log10();
        let ferrite_pearlite = 42.0
            + 223.0 * comp.c
            + 53.0 * comp.si
            + 30.0 * comp.mn
            + 12.6 * comp.ni
            + 7.0 * comp.cr
            + 19.0 * comp.mo
            + (10.0 - 19.0 * comp.si + 4.0 * comp.ni + 8.0 * comp.cr + 130.0 * comp.v) * log_vr;

        Self {
            martensite: martensite.max(100.0),
            bainite: bainite.max(150.0),
            ferrite_pearlite: ferrite_pearlite.max(100.0),
            retained_austenite: RETAINED_AUSTENITE_HV,
        }
        .with_monotonic_martensite()
    }

    /// Martensite is never softer than any other constituent.
    fn with_monotonic_martensite(mut self) -> Self {
        self.martensite = self
            .martensite
            .max(self.bainite)
            .max(self.ferrite_pearlite)
            .max(self.retained_austenite);
        self
    }

    /// Rule of mixtures, floored at 100 HV.
    pub fn mix(&self, f: &PhaseFractions) -> f64 {
        let hv = f.martensite * self.martensite
            + f.bainite * self.bainite
            + (f.ferrite + f.pearlite) * self.ferrite_pearlite
            + f.retained_austenite * self.retained_austenite;
        hv.max(100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toughness {
    Good,
    Acceptable,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardnessEstimate {
    pub hv: f64,
    /// `None` below the Rockwell C range.
    pub hrc: Option<f64>,
    pub uts_mpa: f64,
    pub yield_mpa: f64,
    pub elongation_pct: f64,
    pub toughness: Toughness,
    pub phases: PhaseHardness,
}

impl HardnessEstimate {
    pub fn new(
        fractions: &PhaseFractions,
        comp: Option<&Composition>,
        t_800_500_s: Option<f64>,
    ) -> Self {
        let phases = PhaseHardness::estimate(comp, t_800_500_s);
        let hv = phases.mix(fractions);
        let uts_mpa = uts_from_hv(hv);
        let yield_ratio = if fractions.martensite > 0.5 {
            0.90
        } else if fractions.bainite > 0.3 {
            0.85
        } else {
            0.70
        };
        let elongation_pct = 8.0 * fractions.martensite
            + 16.0 * fractions.bainite
            + 25.0 * (fractions.ferrite + fractions.pearlite)
            + 20.0 * fractions.retained_austenite;
        let toughness = if fractions.martensite > 0.8 {
            Toughness::Poor
        } else if fractions.martensite > 0.4 {
            Toughness::Acceptable
        } else {
            Toughness::Good
        };
        Self {
            hv,
            hrc: hv_to_hrc(hv),
            uts_mpa,
            yield_mpa: yield_ratio * uts_mpa,
            elongation_pct,
            toughness,
            phases,
        }
    }

    /// Hardness after tempering at `temperature_c` for `hold_s`.
    pub fn tempered(&self, temperature_c: f64, hold_s: f64, c: f64) -> TemperedHardness {
        tempered_hardness(self.hv, temperature_c, hold_s, c)
    }
}

/// UTS ≈ 3.45·HV [MPa]
pub fn uts_from_hv(hv: f64) -> f64 {
    3.45 * hv
}

/// ASTM E140 quadratic fit, valid from 200 HV, clamped to 20..68 HRC.
pub fn hv_to_hrc(hv: f64) -> Option<f64> {
    if hv < 200.0 {
        return None;
    }
    let hrc = -0.0001 * hv * hv + 0.1755 * hv - 8.48;
    Some(hrc.clamp(20.0, 68.0))
}

/// Hollomon–Jaffe parameter `T_K·(C + log10 t_h)`.
pub fn hollomon_jaffe(temperature_c: f64, hold_s: f64, c: f64) -> f64 {
    let hours = (hold_s / 3600.0).max(1e-6);
    ht_core::c_to_k(temperature_c) * (c + hours.log10())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperedHardness {
    pub hv: f64,
    pub hrc: Option<f64>,
    pub parameter: f64,
}

/// Parameter below which tempering leaves hardness unchanged.
const HJ_ONSET: f64 = 12_000.0;
/// Parameter at which the fully tempered floor is reached.
const HJ_FULL: f64 = 21_000.0;
const TEMPERED_FLOOR_HV: f64 = 180.0;

/// Linear softening in the Hollomon–Jaffe parameter from the as-quenched
/// hardness down to a floor; never harder than the input.
pub fn tempered_hardness(
    hv_quenched: f64,
    temperature_c: f64,
    hold_s: f64,
    c: f64,
) -> TemperedHardness {
    let parameter = hollomon_jaffe(temperature_c, hold_s, c);
    let progress = ((parameter - HJ_ONSET) / (HJ_FULL - HJ_ONSET)).clamp(0.0, 1.0);
    let hv = if hv_quenched <= TEMPERED_FLOOR_HV {
        hv_quenched
    } else {
        hv_quenched - progress * (hv_quenched - TEMPERED_FLOOR_HV)
    };
    TemperedHardness {
        hv,
        hrc: hv_to_hrc(hv),
        parameter,
    }
}
