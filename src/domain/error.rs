use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the pairs engine.
///
/// Configuration and data-quality variants are recoverable by the caller
/// (fix the input, run again). `InconsistentState` is a programming defect:
/// the signal state machine and the backtester disagree about the open
/// position and the run must be abandoned.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum PairsError {
    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfiguration(Vec<String>),

    #[error("Insufficient data for {method}: requires {required} observations, got {actual}")]
    InsufficientData {
        method: String,
        required: usize,
        actual: usize,
    },

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error(
        "Series are not cointegrated: trace statistic {statistic:.4} <= critical value {critical_value:.4} at {confidence} confidence"
    )]
    NonCointegrated {
        statistic: f64,
        critical_value: f64,
        confidence: f64,
    },

    #[error("Misaligned input: {0}")]
    MisalignedInput(String),

    #[error("Inconsistent position state: {0}")]
    InconsistentState(String),
}

impl PairsError {
    /// Single-violation configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        PairsError::InvalidConfiguration(vec![message.into()])
    }

    pub fn insufficient_data(method: &str, required: usize, actual: usize) -> Self {
        PairsError::InsufficientData {
            method: method.to_string(),
            required,
            actual,
        }
    }

    /// True for errors that indicate a defect rather than bad input
    pub fn is_fatal(&self) -> bool {
        matches!(self, PairsError::InconsistentState(_))
    }
}
