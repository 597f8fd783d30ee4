//! Continuous-cooling phase fractions by Scheil additivity.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{KineticsError, KineticsResult};
use crate::jmak::{JmakParameters, extent, virtual_time};
use crate::params::TransformationParameters;

/// Product and parent phases tracked on cooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Ferrite,
    Pearlite,
    Bainite,
    Martensite,
    RetainedAustenite,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Ferrite,
        Phase::Pearlite,
        Phase::Bainite,
        Phase::Martensite,
        Phase::RetainedAustenite,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Phase::Ferrite => "ferrite",
            Phase::Pearlite => "pearlite",
            Phase::Bainite => "bainite",
            Phase::Martensite => "martensite",
            Phase::RetainedAustenite => "retained austenite",
        }
    }
}

/// Volume fractions; a prediction always sums to 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseFractions {
    pub ferrite: f64,
    pub pearlite: f64,
    pub bainite: f64,
    pub martensite: f64,
    pub retained_austenite: f64,
}

impl PhaseFractions {
    pub fn get(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Ferrite => self.ferrite,
            Phase::Pearlite => self.pearlite,
            Phase::Bainite => self.bainite,
            Phase::Martensite => self.martensite,
            Phase::RetainedAustenite => self.retained_austenite,
        }
    }

    pub fn sum(&self) -> f64 {
        Phase::ALL.iter().map(|p| self.get(*p)).sum()
    }

    /// Phase with the largest fraction.
    pub fn dominant(&self) -> Phase {
        Phase::ALL
            .into_iter()
            .fold(Phase::RetainedAustenite, |best, p| {
                if self.get(p) > self.get(best) { p } else { best }
            })
    }

    /// Clamp every fraction to [0, 1] and rescale so they sum to 1.
    pub fn normalized(self) -> Self {
        let clamp = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        let c = Self {
            ferrite: clamp(self.ferrite),
            pearlite: clamp(self.pearlite),
            bainite: clamp(self.bainite),
            martensite: clamp(self.martensite),
            retained_austenite: clamp(self.retained_austenite),
        };
        let total = c.sum();
        if total <= 0.0 {
            return Self {
                retained_austenite: 1.0,
                ..Self::default()
            };
        }
        Self {
            ferrite: c.ferrite / total,
            pearlite: c.pearlite / total,
            bainite: c.bainite / total,
            martensite: c.martensite / total,
            retained_austenite: c.retained_austenite / total,
        }
    }
}

/// First point at which a product phase reached 1 % of the volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformationStart {
    pub phase: Phase,
    pub time_s: f64,
    pub temperature_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseFractionResult {
    pub fractions: PhaseFractions,
    /// Peak temperature the prediction starts from.
    pub austenitizing_c: f64,
    /// Lowest temperature reached after the peak.
    pub minimum_c: f64,
    pub starts: Vec<TransformationStart>,
}

/// Temperature against time at one material point.
#[derive(Debug, Clone, Copy)]
pub struct CoolingHistory<'a> {
    times: &'a [f64],
    temperatures: &'a [f64],
}

impl<'a> CoolingHistory<'a> {
    pub fn new(times: &'a [f64], temperatures: &'a [f64]) -> KineticsResult<Self> {
        if times.len() != temperatures.len() {
            return Err(KineticsError::InvalidHistory {
                reason: format!(
                    "{} times but {} temperatures",
                    times.len(),
                    temperatures.len()
                ),
            });
        }
        if times.is_empty() {
            return Err(KineticsError::InvalidHistory {
                reason: "no samples".to_string(),
            });
        }
        if times.iter().chain(temperatures).any(|v| !v.is_finite()) {
            return Err(KineticsError::InvalidHistory {
                reason: "non-finite sample".to_string(),
            });
        }
        if times.windows(2).any(|w| w[1] < w[0]) {
            return Err(KineticsError::InvalidHistory {
                reason: "times must be non-decreasing".to_string(),
            });
        }
        Ok(Self {
            times,
            temperatures,
        })
    }

    pub fn times(&self) -> &'a [f64] {
        self.times
    }

    pub fn temperatures(&self) -> &'a [f64] {
        self.temperatures
    }

    /// Index of the first maximum temperature.
    pub(crate) fn peak_index(&self) -> usize {
        self.temperatures
            .iter()
            .enumerate()
            .fold(0, |best, (i, t)| {
                if *t > self.temperatures[best] { i } else { best }
            })
    }
}

struct Diffusive<'p> {
    phase: Phase,
    jmak: &'p JmakParameters,
    /// Active window (lo, hi]
    window: (f64, f64),
    extent: f64,
    formed: f64,
}

/// Phase fractions at the end of `history`.
///
/// The material is taken as fully austenitic at the history's peak
/// temperature; only the path after the peak is integrated. Diffusive phases
/// advance by the virtual-time rule inside their windows, then martensite
/// forms below Ms from the austenite left when Ms was first crossed.
pub fn predict(
    history: &CoolingHistory<'_>,
    params: &TransformationParameters,
) -> KineticsResult<PhaseFractionResult> {
    params.validate()?;
    let ct = params.critical;
    let grain = params.grain_factor();

    let mut diffusive: Vec<Diffusive<'_>> = [
        (Phase::Ferrite, &params.ferrite, (ct.bs_c + 20.0, ct.ae3_c)),
        (Phase::Pearlite, &params.pearlite, (ct.bs_c, ct.ae1_c)),
        (Phase::Bainite, &params.bainite, (ct.ms_c, ct.bs_c)),
    ]
    .into_iter()
    .filter_map(|(phase, jmak, window)| {
        jmak.as_ref().map(|jmak| Diffusive {
            phase,
            jmak,
            window,
            extent: 0.0,
            formed: 0.0,
        })
    })
    .collect();

    let times = history.times;
    let temps = history.temperatures;
    let peak = history.peak_index();

    let mut austenite = 1.0;
    let mut martensite = 0.0;
    // Austenite available when Ms was first crossed.
    let mut ms_parent: Option<f64> = None;
    let mut minimum_c = temps[peak];
    let mut starts = Vec::new();

    for k in (peak + 1)..times.len() {
        let dt = times[k] - times[k - 1];
        let t_now = temps[k];
        minimum_c = minimum_c.min(t_now);
        if dt > 0.0 {
            let t_mid = 0.5 * (temps[k - 1] + t_now);
            for d in diffusive.iter_mut() {
                if austenite <= 0.0 {
                    break;
                }
                let (lo, hi) = d.window;
                if !(t_mid > lo && t_mid <= hi) {
                    continue;
                }
                let b = d.jmak.rate.rate(t_mid) * grain;
                let Some(t_virtual) = virtual_time(b, d.jmak.n, d.extent) else {
                    continue;
                };
                let x_new = extent(b, d.jmak.n, t_virtual + dt);
                let increment = ((x_new - d.extent).max(0.0) * austenite).min(austenite);
                d.extent = x_new.max(d.extent);
                let before = d.formed;
                d.formed += increment;
                austenite -= increment;
                if before < 0.01 && d.formed >= 0.01 {
                    starts.push(TransformationStart {
                        phase: d.phase,
                        time_s: times[k],
                        temperature_c: t_now,
                    });
                }
            }
        }

        if t_now < ct.ms_c {
            let parent = *ms_parent.get_or_insert(austenite);
            let target = parent * params.martensite.fraction(ct.ms_c - minimum_c);
            let increment = (target - martensite).clamp(0.0, austenite.max(0.0));
            if martensite < 0.01 && martensite + increment >= 0.01 {
                starts.push(TransformationStart {
                    phase: Phase::Martensite,
                    time_s: times[k],
                    temperature_c: t_now,
                });
            }
            martensite += increment;
            austenite -= increment;
        }
    }

    let formed = |phase: Phase| {
        diffusive
            .iter()
            .find(|d| d.phase == phase)
            .map_or(0.0, |d| d.formed)
    };
    let fractions = PhaseFractions {
        ferrite: formed(Phase::Ferrite),
        pearlite: formed(Phase::Pearlite),
        bainite: formed(Phase::Bainite),
        martensite,
        retained_austenite: austenite,
    }
    .normalized();
    trace!(
        peak_c = temps[peak],
        minimum_c,
        martensite = fractions.martensite,
        "phase fractions predicted"
    );

    Ok(PhaseFractionResult {
        fractions,
        austenitizing_c: temps[peak],
        minimum_c,
        starts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Newtonian cooling `T = T∞ + (T0 − T∞)·exp(−t/τ)` sampled every `dt`.
    fn newtonian(t0: f64, t_inf: f64, tau: f64, duration: f64, dt: f64) -> (Vec<f64>, Vec<f64>) {
        let n = (duration / dt).round() as usize;
        let times: Vec<f64> = (0..=n).map(|i| i as f64 * dt).collect();
        let temps = times
            .iter()
            .map(|t| t_inf + (t0 - t_inf) * (-t / tau).exp())
            .collect();
        (times, temps)
    }

    fn run(times: &[f64], temps: &[f64]) -> PhaseFractionResult {
        let history = CoolingHistory::new(times, temps).unwrap();
        predict(&history, &TransformationParameters::default()).unwrap()
    }

    #[test]
    fn fast_quench_is_mostly_martensite() {
        let (t, temps) = newtonian(900.0, 20.0, 2.0, 60.0, 0.05);
        let result = run(&t, &temps);
        let f = result.fractions;
        assert!(f.martensite > 0.9, "{f:?}");
        assert!((f.sum() - 1.0).abs() < 1e-9);
        assert_eq!(f.dominant(), Phase::Martensite);
        assert!(result.starts.iter().any(|s| s.phase == Phase::Martensite));
    }

    #[test]
    fn slow_cooling_avoids_martensite() {
        let (t, temps) = newtonian(900.0, 20.0, 5000.0, 50_000.0, 10.0);
        let f = run(&t, &temps).fractions;
        assert!(f.martensite < 0.1, "{f:?}");
        assert!(f.ferrite + f.pearlite > 0.8, "{f:?}");
    }

    #[test]
    fn heating_before_the_peak_is_ignored() {
        // Ramp up through the diffusive windows, then quench.
        let mut times = vec![0.0, 600.0, 1200.0];
        let mut temps = vec![20.0, 600.0, 900.0];
        let (qt, qtemps) = newtonian(900.0, 20.0, 2.0, 60.0, 0.05);
        times.extend(qt.iter().skip(1).map(|t| 1200.0 + t));
        temps.extend(qtemps.iter().skip(1));
        let result = run(&times, &temps);
        assert_eq!(result.austenitizing_c, 900.0);
        assert!(result.fractions.martensite > 0.9);
    }

    #[test]
    fn above_ms_everything_stays_austenite_without_kinetics() {
        let params = TransformationParameters {
            ferrite: None,
            pearlite: None,
            bainite: None,
            ..TransformationParameters::default()
        };
        let times = [0.0, 10.0, 20.0];
        let temps = [900.0, 600.0, 400.0];
        let history = CoolingHistory::new(&times, &temps).unwrap();
        let f = predict(&history, &params).unwrap().fractions;
        assert_eq!(f.retained_austenite, 1.0);
    }

    #[test]
    fn martensite_follows_koistinen_marburger() {
        let params = TransformationParameters {
            ferrite: None,
            pearlite: None,
            bainite: None,
            ..TransformationParameters::default()
        };
        let times = [0.0, 1.0, 2.0];
        let temps = [900.0, 400.0, 250.0];
        let history = CoolingHistory::new(&times, &temps).unwrap();
        let f = predict(&history, &params).unwrap().fractions;
        let expected = 1.0 - (-0.011f64 * 100.0).exp();
        assert!((f.martensite - expected).abs() < 1e-12);
        assert!((f.retained_austenite - (1.0 - expected)).abs() < 1e-12);
    }

    #[test]
    fn rejects_malformed_history() {
        assert!(CoolingHistory::new(&[0.0, 1.0], &[900.0]).is_err());
        assert!(CoolingHistory::new(&[], &[]).is_err());
        assert!(CoolingHistory::new(&[1.0, 0.0], &[900.0, 800.0]).is_err());
        assert!(CoolingHistory::new(&[0.0, 1.0], &[900.0, f64::NAN]).is_err());
    }

    #[test]
    fn normalization_handles_degenerate_input() {
        let f = PhaseFractions {
            ferrite: -0.5,
            martensite: f64::NAN,
            ..PhaseFractions::default()
        }
        .normalized();
        assert_eq!(f.retained_austenite, 1.0);
        let f = PhaseFractions {
            ferrite: 2.0,
            bainite: 1.0,
            ..PhaseFractions::default()
        }
        .normalized();
        assert!((f.ferrite - 0.5).abs() < 1e-15);
    }
}
