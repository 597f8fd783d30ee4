//! Turn a finished (or partial) cycle into result records.

use ht_core::cooling_time;
use ht_mesh::ProbeLocation;
use ht_sim::{CycleResult, LocationMicrostructure, rate_series};

use crate::types::{ResultPayload, SimulationResult};

/// Records for every stage in `cycle`; only completed stages are present, so
/// partial cycles produce records scoped to what actually ran.
///
/// - full-cycle cooling curves at the center and surface
/// - per-stage curves at every probe location
/// - the recorded temperature fields over `positions_m`
/// - the center cooling rate
/// - phase fractions and hardness per location from `microstructure`
pub fn collect_results(
    cycle: &CycleResult,
    positions_m: &[f64],
    microstructure: &[LocationMicrostructure],
) -> Vec<SimulationResult> {
    let mut out = Vec::new();
    if cycle.phases.is_empty() {
        return out;
    }

    for location in [ProbeLocation::Center, ProbeLocation::Surface] {
        let (times, temps) = cycle.probe_series(location);
        out.push(SimulationResult::new(None, Some(location), curve(times, temps)));
    }

    for run in &cycle.phases {
        let times: Vec<f64> = run
            .history
            .step_times()
            .iter()
            .map(|t| run.start_time_s + t)
            .collect();
        for location in ProbeLocation::ALL {
            let Some(series) = run.history.probe(location) else {
                continue;
            };
            out.push(SimulationResult::new(
                Some(run.phase),
                Some(location),
                curve(times.clone(), series.to_vec()),
            ));
        }
    }

    let (times, fields) = cycle.recorded_fields();
    out.push(SimulationResult::new(
        None,
        None,
        ResultPayload::TemperatureProfile {
            positions_m: positions_m.to_vec(),
            times_s: times,
            fields_c: fields.iter().map(|f| f.as_slice().to_vec()).collect(),
        },
    ));

    let (times, temps) = cycle.probe_series(ProbeLocation::Center);
    let (rate_times, rates) = rate_series(&times, &temps);
    out.push(SimulationResult::new(
        None,
        Some(ProbeLocation::Center),
        ResultPayload::CoolingRate {
            times_s: rate_times,
            rates_c_per_s: rates,
        },
    ));

    for m in microstructure {
        out.push(SimulationResult::new(
            None,
            Some(m.prediction.location),
            ResultPayload::PhaseFractions {
                phases: m.prediction.phases.clone(),
                t_800_500_s: m.prediction.t_800_500_s,
                hardness: m.prediction.hardness,
                tempered: m.tempered,
            },
        ));
    }
    out
}

fn curve(times_s: Vec<f64>, temperatures_c: Vec<f64>) -> ResultPayload {
    let (_, rates) = rate_series(&times_s, &temperatures_c);
    let peak_cooling_rate_c_per_s = rates.iter().map(|r| -r).fold(0.0, f64::max);
    ResultPayload::CoolingCurve {
        t_800_500_s: cooling_time(&times_s, &temperatures_c, 800.0, 500.0),
        peak_cooling_rate_c_per_s,
        times_s,
        temperatures_c,
    }
}
