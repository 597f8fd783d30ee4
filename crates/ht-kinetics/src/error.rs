use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KineticsError {
    #[error("invalid transformation parameter {what}: {value}")]
    InvalidParameter { what: &'static str, value: f64 },

    #[error("critical temperatures out of order: {reason}")]
    CriticalOrder { reason: String },

    #[error("invalid cooling history: {reason}")]
    InvalidHistory { reason: String },
}

pub type KineticsResult<T> = Result<T, KineticsError>;
