//! Error types for the statistics core and the dataset loader.

use thiserror::Error;

/// Errors raised while validating samples or running the proportion test.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("Invalid {group} sample: {reason}")]
    InvalidSample { group: String, reason: String },

    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Confidence level must be strictly between 0 and 100, got {0}")]
    InvalidConfidence(f64),
}

impl StatsError {
    pub(crate) fn invalid_sample(group: &str, reason: impl Into<String>) -> Self {
        StatsError::InvalidSample {
            group: group.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while reading the click dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Dataset file is empty or has no header row")]
    EmptyFile,
}
