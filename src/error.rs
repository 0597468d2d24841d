use thiserror::Error;

/// Failure of a checked arithmetic operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("arithmetic underflow")]
    Underflow,

    #[error("division by zero")]
    DivideByZero,

    #[error("argument outside the function domain")]
    Domain,
}

#[derive(Error, Debug)]
pub enum MemeticoError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid random range: min {min} is greater than max {max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("Numeric error: {0}")]
    Numeric(#[from] NumericError),

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MemeticoError>;
