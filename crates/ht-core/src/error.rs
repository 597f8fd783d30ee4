use thiserror::Error;

pub type HtResult<T> = Result<T, HtError>;

#[derive(Error, Debug)]
pub enum HtError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Value for {what} must be positive, got {value}")]
    NotPositive { what: &'static str, value: f64 },
}
