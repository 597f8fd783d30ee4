//! Material property errors.

use thiserror::Error;

pub type MaterialResult<T> = Result<T, MaterialError>;

/// A property is missing, malformed, or non-physical at the operating temperature.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterialError {
    #[error("Non-physical {property} = {value} at {temperature_c} °C")]
    NonPhysical {
        property: &'static str,
        temperature_c: f64,
        value: f64,
    },

    #[error("Invalid {property} curve: {reason}")]
    InvalidCurve {
        property: &'static str,
        reason: String,
    },

    #[error("Invalid expression '{expression}': {reason}")]
    Expression { expression: String, reason: String },

    #[error("Unknown steel grade: {name}")]
    UnknownGrade { name: String },
}
