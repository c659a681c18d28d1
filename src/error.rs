use thiserror::Error;

use crate::models::Frequency;

/// Errors surfaced by the normalization and forecasting engine.
///
/// None of these are fatal; callers decide whether to skip the series,
/// report the problem, or fall back to an empty forecast.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Malformed period label '{label}' for {frequency:?} series")]
    Format { label: String, frequency: Frequency },

    #[error("Not enough data: {actual} usable points, need at least {required}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Period '{0}' is not present in the series")]
    MissingPeriod(String),

    #[error("Range end '{end}' precedes range begin '{begin}'")]
    InvalidRange { begin: String, end: String },

    #[error("Unknown aggregator: {0}")]
    UnknownAggregator(String),

    #[error("Unknown predictor: {0}")]
    UnknownPredictor(String),

    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("Invalid World Bank payload: {0}")]
    Payload(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl EngineError {
    pub fn format(label: &str, frequency: Frequency) -> Self {
        EngineError::Format {
            label: label.to_string(),
            frequency,
        }
    }

    /// True when the failure only means "not enough observations yet".
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, EngineError::InsufficientData { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
