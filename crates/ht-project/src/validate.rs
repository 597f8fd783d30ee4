//! Configuration validation, run before a simulation may become ready.

use ht_kinetics::KineticsError;
use ht_material::{MaterialError, OperatingRange};
use ht_mesh::{MeshError, discretize};
use ht_solver::SolverError;

use crate::schema::{
    CoolDownConfig, EndCondition, FurnaceRamp, HeatingConfig, LATEST_VERSION, PhaseConfig,
    PhaseKind, QuenchConfig, SimulationConfig, TemperingConfig, TransferConfig,
};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid phase sequence: {reason}")]
    PhaseSequence { reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Geometry error: {0}")]
    Geometry(#[from] MeshError),

    #[error("Solver settings error: {0}")]
    Solver(#[from] SolverError),

    #[error("Material error: {0}")]
    Material(#[from] MaterialError),

    #[error("Transformation parameters error: {0}")]
    Kinetics(#[from] KineticsError),
}

impl ValidationError {
    /// Material data problems are reported apart from other configuration
    /// errors.
    pub fn is_material(&self) -> bool {
        matches!(self, ValidationError::Material(_))
    }
}

/// Range every configured temperature must fall in [°C].
const TEMPERATURE_RANGE: (f64, f64) = (-50.0, 1500.0);

pub fn validate_config(config: &SimulationConfig) -> Result<(), ValidationError> {
    if config.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }
    if config.name.trim().is_empty() {
        return Err(invalid("name", "\"\"", "must not be empty"));
    }

    config.geometry.validate()?;
    config.solver.validate()?;
    discretize(&config.geometry, config.solver.n_nodes)?;

    let material = config.material.resolve()?;
    let max_c = config
        .enabled_phases()
        .map(peak_temperature)
        .fold(config.start_temperature_c(), f64::max);
    material.validate(OperatingRange {
        max_c: OperatingRange::default().max_c.max(max_c),
        ..OperatingRange::default()
    })?;
    config.transformation_for(&material).validate()?;

    temperature("initial_temperature_c", config.initial_temperature_c)?;
    validate_sequence(&config.phases)?;
    for phase in &config.phases {
        match phase {
            PhaseConfig::Heating(c) => validate_heating(c)?,
            PhaseConfig::Transfer(c) => validate_transfer(c)?,
            PhaseConfig::Quenching(c) => validate_quench(c)?,
            PhaseConfig::Tempering(c) => validate_tempering(c)?,
        }
    }
    Ok(())
}

fn peak_temperature(phase: &PhaseConfig) -> f64 {
    match phase {
        PhaseConfig::Heating(c) => c.target_temperature_c.max(c.initial_temperature_c),
        PhaseConfig::Transfer(c) => c.ambient_temperature_c,
        PhaseConfig::Quenching(c) => c.media_temperature_c,
        PhaseConfig::Tempering(c) => c.temperature_c,
    }
}

/// Stages appear at most once, in cycle order, and quenching is present.
fn validate_sequence(phases: &[PhaseConfig]) -> Result<(), ValidationError> {
    let kinds: Vec<PhaseKind> = phases.iter().map(PhaseConfig::kind).collect();
    if let Some(w) = kinds.windows(2).find(|w| w[0] >= w[1]) {
        return Err(ValidationError::PhaseSequence {
            reason: format!("{} may not precede {}", w[0], w[1]),
        });
    }
    if !kinds.contains(&PhaseKind::Quenching) {
        return Err(ValidationError::PhaseSequence {
            reason: "quenching is mandatory".to_string(),
        });
    }
    Ok(())
}

fn validate_heating(c: &HeatingConfig) -> Result<(), ValidationError> {
    temperature("heating.initial_temperature_c", c.initial_temperature_c)?;
    temperature("heating.target_temperature_c", c.target_temperature_c)?;
    non_negative("heating.hold_s", c.hold_s)?;
    non_negative("heating.htc", c.htc)?;
    emissivity("heating.emissivity", c.emissivity)?;
    if let Some(ramp) = &c.ramp {
        validate_ramp("heating.ramp", ramp)?;
    }
    if c.duration_s() <= 0.0 {
        return Err(invalid(
            "heating.hold_s",
            &c.hold_s.to_string(),
            "heating needs a hold or a ramp",
        ));
    }
    end_condition("heating.end_condition", &c.end_condition)
}

fn validate_transfer(c: &TransferConfig) -> Result<(), ValidationError> {
    positive("transfer.duration_s", c.duration_s)?;
    temperature("transfer.ambient_temperature_c", c.ambient_temperature_c)?;
    non_negative("transfer.htc", c.htc)?;
    emissivity("transfer.emissivity", c.emissivity)
}

fn validate_quench(c: &QuenchConfig) -> Result<(), ValidationError> {
    temperature("quenching.media_temperature_c", c.media_temperature_c)?;
    positive("quenching.duration_s", c.duration_s)?;
    if let Some(htc) = c.htc_override {
        positive("quenching.htc_override", htc)?;
    }
    emissivity("quenching.emissivity", Some(c.emissivity))?;
    end_condition("quenching.end_condition", &c.end_condition)
}

fn validate_tempering(c: &TemperingConfig) -> Result<(), ValidationError> {
    temperature("tempering.temperature_c", c.temperature_c)?;
    non_negative("tempering.hold_s", c.hold_s)?;
    non_negative("tempering.htc", c.htc)?;
    emissivity("tempering.emissivity", c.emissivity)?;
    if let Some(ramp) = &c.ramp {
        validate_ramp("tempering.ramp", ramp)?;
    }
    if c.enabled && c.duration_s() <= 0.0 {
        return Err(invalid(
            "tempering.hold_s",
            &c.hold_s.to_string(),
            "tempering needs a hold or a ramp",
        ));
    }
    end_condition("tempering.end_condition", &c.end_condition)?;
    validate_cool_down(&c.cool_down)
}

fn validate_cool_down(c: &CoolDownConfig) -> Result<(), ValidationError> {
    temperature(
        "tempering.cool_down.ambient_temperature_c",
        c.ambient_temperature_c,
    )?;
    non_negative("tempering.cool_down.htc", c.htc)?;
    positive("tempering.cool_down.duration_s", c.duration_s)?;
    end_condition("tempering.cool_down.end_condition", &c.end_condition)
}

fn validate_ramp(field: &str, ramp: &FurnaceRamp) -> Result<(), ValidationError> {
    temperature(&format!("{field}.start_temperature_c"), ramp.start_temperature_c)?;
    positive(&format!("{field}.rate_c_per_min"), ramp.rate_c_per_min)
}

fn end_condition(field: &str, end: &EndCondition) -> Result<(), ValidationError> {
    match *end {
        EndCondition::FixedDuration => Ok(()),
        EndCondition::RateThreshold {
            threshold_c_per_hr,
            window_s,
            hold_after_trigger_s,
            ..
        } => {
            positive(&format!("{field}.threshold_c_per_hr"), threshold_c_per_hr)?;
            positive(&format!("{field}.window_s"), window_s)?;
            non_negative(&format!("{field}.hold_after_trigger_s"), hold_after_trigger_s)
        }
        EndCondition::Equilibrium { epsilon_c } => {
            positive(&format!("{field}.epsilon_c"), epsilon_c)
        }
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &value.to_string(), "must be positive"))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &value.to_string(), "must be non-negative"))
    }
}

fn temperature(field: &str, value: f64) -> Result<(), ValidationError> {
    let (lo, hi) = TEMPERATURE_RANGE;
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            field,
            &value.to_string(),
            &format!("must lie in [{lo}, {hi}] °C"),
        ))
    }
}

fn emissivity(field: &str, value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(eps) if !(eps.is_finite() && (0.0..=1.0).contains(&eps)) => {
            Err(invalid(field, &eps.to_string(), "must lie in [0, 1]"))
        }
        _ => Ok(()),
    }
}
