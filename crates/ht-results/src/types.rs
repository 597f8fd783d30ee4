//! Result records.

use ht_kinetics::{HardnessEstimate, PhaseFractionResult, TemperedHardness};
use ht_mesh::ProbeLocation;
use ht_project::PhaseKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    CoolingCurve,
    TemperatureProfile,
    PhaseFractions,
    CoolingRate,
}

impl ResultType {
    pub fn label(self) -> &'static str {
        match self {
            ResultType::CoolingCurve => "cooling_curve",
            ResultType::TemperatureProfile => "temperature_profile",
            ResultType::PhaseFractions => "phase_fractions",
            ResultType::CoolingRate => "cooling_rate",
        }
    }
}

/// Identifies one record. `phase: None` means the whole cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultKey {
    pub result_type: ResultType,
    pub phase: Option<PhaseKind>,
    pub location: Option<ProbeLocation>,
}

impl ResultKey {
    pub fn new(
        result_type: ResultType,
        phase: Option<PhaseKind>,
        location: Option<ProbeLocation>,
    ) -> Self {
        Self {
            result_type,
            phase,
            location,
        }
    }

    /// "full_cycle" or the phase label.
    pub fn scope_label(&self) -> &'static str {
        self.phase.map_or("full_cycle", PhaseKind::label)
    }
}

impl std::fmt::Display for ResultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.result_type.label(), self.scope_label())?;
        if let Some(loc) = self.location {
            write!(f, "/{}", loc.label())?;
        }
        Ok(())
    }
}

/// Typed payload; the variant fixes the record's result type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultPayload {
    CoolingCurve {
        times_s: Vec<f64>,
        temperatures_c: Vec<f64>,
        t_800_500_s: Option<f64>,
        peak_cooling_rate_c_per_s: f64,
    },
    TemperatureProfile {
        positions_m: Vec<f64>,
        times_s: Vec<f64>,
        /// One row per recorded time, one column per node.
        fields_c: Vec<Vec<f64>>,
    },
    PhaseFractions {
        phases: PhaseFractionResult,
        t_800_500_s: Option<f64>,
        hardness: HardnessEstimate,
        tempered: Option<TemperedHardness>,
    },
    CoolingRate {
        times_s: Vec<f64>,
        rates_c_per_s: Vec<f64>,
    },
}

impl ResultPayload {
    pub fn result_type(&self) -> ResultType {
        match self {
            ResultPayload::CoolingCurve { .. } => ResultType::CoolingCurve,
            ResultPayload::TemperatureProfile { .. } => ResultType::TemperatureProfile,
            ResultPayload::PhaseFractions { .. } => ResultType::PhaseFractions,
            ResultPayload::CoolingRate { .. } => ResultType::CoolingRate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub key: ResultKey,
    pub payload: ResultPayload,
    /// Reference to a rendered artifact kept elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

impl SimulationResult {
    pub fn new(
        phase: Option<PhaseKind>,
        location: Option<ProbeLocation>,
        payload: ResultPayload,
    ) -> Self {
        Self {
            key: ResultKey::new(payload.result_type(), phase, location),
            payload,
            artifact: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_follows_payload() {
        let r = SimulationResult::new(
            Some(PhaseKind::Quenching),
            Some(ProbeLocation::Center),
            ResultPayload::CoolingRate {
                times_s: vec![1.0],
                rates_c_per_s: vec![-3.0],
            },
        );
        assert_eq!(r.key.result_type, ResultType::CoolingRate);
        assert_eq!(r.key.to_string(), "cooling_rate/quenching/center");

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["payload"]["type"], "cooling_rate");
        assert!(json.get("artifact").is_none());
    }

    #[test]
    fn full_cycle_scope() {
        let key = ResultKey::new(ResultType::TemperatureProfile, None, None);
        assert_eq!(key.to_string(), "temperature_profile/full_cycle");
    }
}
