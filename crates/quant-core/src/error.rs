use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised at configuration-construction time.
///
/// Quantitative paths never raise for expected edge cases: empty trade sets
/// produce zero-value metrics, undefined ratios come back as `None`, and a
/// blocked trade is reported through the risk check contract, not an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error("Invalid date range: start {start} is not before end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Thresholds out of order: {0}")]
    UnorderedThresholds(String),
}

impl ConfigError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            message: message.into(),
        }
    }
}
