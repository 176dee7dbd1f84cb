// =============================================================================
// Engine Errors
// =============================================================================
//
// Only conditions that make an analysis call meaningless are errors. Numeric
// degeneracy (flat windows, zero range, zero volume) is resolved locally by
// each analyzer and never surfaces here.

use thiserror::Error;

/// Errors surfaced by the analysis engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The bar series is shorter than the regime window.
    #[error("Insufficient data: need at least {required} bars, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// A bar failed validation or could not be decoded.
    #[error("Malformed input at bar {index}: {reason}")]
    MalformedInput { index: usize, reason: String },

    /// An auxiliary per-bar series does not line up with the price series.
    #[error("Length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Engine configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            index,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message_mentions_need() {
        let err = EngineError::InsufficientData {
            required: 100,
            actual: 10,
        };
        let msg = err.to_string().to_lowercase();
        assert!(msg.contains("insufficient"));
        assert!(msg.contains("need at least 100"));
    }

    #[test]
    fn malformed_helper_builds_variant() {
        let err = EngineError::malformed(3, "high < low");
        assert_eq!(
            err,
            EngineError::MalformedInput {
                index: 3,
                reason: "high < low".to_string()
            }
        );
    }
}
