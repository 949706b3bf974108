//! Error types for parcache.

use thiserror::Error;

use crate::types::point::Point;

/// Default result type for parcache.
pub type ParCacheResult<T> = Result<T, ParCacheError>;

/// Errors raised by parcache.
#[derive(Error, Debug)]
pub enum ParCacheError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid point: {0}")]
    InvalidPoint(String),

    /// The evaluation was interrupted by an abort or a pool shutdown.
    #[error("Evaluation of {point} was cancelled")]
    EvaluationCancelled { point: Point },

    /// The function reported a domain-level failure.
    #[error("Evaluation of {point} failed: {reason}")]
    EvaluationFailed { point: Point, reason: String },

    /// A worker failed in a way the function did not report (a panic).
    /// This indicates a defect.
    #[error("Internal fault while evaluating {point}: {message}")]
    InternalFault { point: Point, message: String },

    /// The cache was used against its state contract.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("{0}")]
    Other(String),
}

impl ParCacheError {
    /// Creates a generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a protocol violation.
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    /// Whether this error reports a cancelled evaluation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::EvaluationCancelled { .. })
    }

    /// Whether this error reports a misuse of the cache API.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let point = Point::new(vec![0.5, 0.25]);

        let cancelled = ParCacheError::EvaluationCancelled {
            point: point.clone(),
        };
        assert_eq!(
            cancelled.to_string(),
            "Evaluation of Point[0.5,0.25] was cancelled"
        );
        assert!(cancelled.is_cancelled());

        let failed = ParCacheError::EvaluationFailed {
            point,
            reason: "solver diverged".to_string(),
        };
        assert!(failed.to_string().contains("solver diverged"));
        assert!(!failed.is_cancelled());
    }

    #[test]
    fn test_helpers() {
        assert!(ParCacheError::protocol("not computed").is_protocol_violation());
        assert!(matches!(ParCacheError::config("x"), ParCacheError::Config(_)));
        assert_eq!(ParCacheError::other("boom").to_string(), "boom");
    }
}
