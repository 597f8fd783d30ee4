//! Phase fractions and hardness from a finished cycle.

use ht_kinetics::{
    CoolingHistory, KineticsResult, LocationPrediction, TemperedHardness,
    TransformationParameters, predict_profile,
};
use ht_mesh::ProbeLocation;
use ht_project::{PhaseKind, TemperingConfig};
use serde::{Deserialize, Serialize};

use crate::cycle::CycleResult;

/// Prediction at one location, with the tempered hardness when the cycle tempers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMicrostructure {
    pub prediction: LocationPrediction,
    pub tempered: Option<TemperedHardness>,
}

/// Transformation is evaluated on the path up to the end of quenching.
/// Tempering only softens what the quench produced.
pub fn predict_microstructure(
    cycle: &CycleResult,
    params: &TransformationParameters,
    tempering: Option<&TemperingConfig>,
) -> KineticsResult<Vec<LocationMicrostructure>> {
    let quench_end = cycle
        .phase(PhaseKind::Quenching)
        .map(|run| run.summary.end_time_s)
        .unwrap_or_else(|| cycle.duration_s());

    let series: Vec<(ProbeLocation, Vec<f64>, Vec<f64>)> = ProbeLocation::ALL
        .iter()
        .map(|loc| {
            let (times, temps) = cycle.probe_series(*loc);
            let keep = times.partition_point(|t| *t <= quench_end + 1e-9);
            (*loc, times[..keep].to_vec(), temps[..keep].to_vec())
        })
        .collect();

    let histories = series
        .iter()
        .map(|(loc, times, temps)| Ok((*loc, CoolingHistory::new(times, temps)?)))
        .collect::<KineticsResult<Vec<_>>>()?;
    let predictions = predict_profile(&histories, params)?;

    Ok(predictions
        .into_iter()
        .map(|prediction| {
            let tempered = tempering.filter(|t| t.enabled).map(|t| {
                prediction
                    .hardness
                    .tempered(t.temperature_c, t.hold_s, params.hollomon_jaffe_c)
            });
            LocationMicrostructure {
                prediction,
                tempered,
            }
        })
        .collect())
}
