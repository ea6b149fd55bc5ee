use thiserror::Error;

/// Rejections raised while constructing model entities
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("probability {value} is outside [0, 1]")]
    ProbabilityOutOfRange { value: f64 },

    #[error("unknown confidence level '{0}' (expected low, medium or high)")]
    UnknownConfidence(String),

    #[error("invalid confidence interval [{low}, {high}]")]
    InvalidInterval { low: f64, high: f64 },

    #[error("confidence hint {value} for signal {signal_id} is outside [0, 1]")]
    InvalidConfidenceHint { signal_id: String, value: f64 },

    #[error("signal {signal_id} of type {signal_type} expects a {expected} value")]
    WrongValueShape {
        signal_id: String,
        signal_type: String,
        expected: &'static str,
    },

    #[error("unknown change type '{0}'")]
    UnknownChangeType(String),
}
