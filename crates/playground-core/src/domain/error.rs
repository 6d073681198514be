//! Domain-level error taxonomy for the playground engine.

/// Failures at the evaluator boundary.
///
/// Every variant is recoverable: the session turns it into a single internal
/// diagnostic and keeps the last good parameter list.
#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error("evaluator rejected the request: {0}")]
    Rejected(String),

    #[error("evaluator returned no output")]
    MissingOutput,

    #[error("evaluator returned malformed output: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("evaluator timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("failed to start evaluator: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("evaluator is not configured")]
    NotConfigured,

    /// The evaluator task died without producing an error value.
    #[error("an unknown error occurred while evaluating the template")]
    Unknown,
}

impl EvaluatorError {
    /// Short, stable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EvaluatorError::Rejected(_) => "EvaluatorRejected",
            EvaluatorError::MissingOutput => "MissingOutput",
            EvaluatorError::Malformed(_) => "MalformedOutput",
            EvaluatorError::Timeout { .. } => "EvaluatorTimeout",
            EvaluatorError::Spawn(_) => "SpawnError",
            EvaluatorError::NotConfigured => "NotConfigured",
            EvaluatorError::Unknown => "UnknownError",
        }
    }
}

/// Playground domain errors.
#[derive(Debug, thiserror::Error)]
pub enum PlaygroundError {
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("parameter {name} is invalid: {message}")]
    InvalidParameter { name: String, message: String },

    #[error("unknown workspace owner: {0}")]
    UnknownOwner(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("playground loop has shut down")]
    Closed,

    #[error("playground task failed: {0}")]
    Task(String),
}

/// Result type for playground domain operations.
pub type Result<T> = std::result::Result<T, PlaygroundError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluator_error_display() {
        let err = EvaluatorError::Rejected("boom".to_string());
        assert!(err.to_string().contains("rejected"));
        assert!(err.to_string().contains("boom"));

        let err = EvaluatorError::Timeout { timeout_ms: 250 };
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn test_evaluator_error_kind() {
        let malformed = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(EvaluatorError::from(malformed).kind(), "MalformedOutput");
        assert_eq!(EvaluatorError::MissingOutput.kind(), "MissingOutput");
        assert_eq!(EvaluatorError::Unknown.kind(), "UnknownError");
    }

    #[test]
    fn test_invalid_parameter_error() {
        let err = PlaygroundError::InvalidParameter {
            name: "cpu".to_string(),
            message: "Value 0 is less than 1".to_string(),
        };
        assert_eq!(err.to_string(), "parameter cpu is invalid: Value 0 is less than 1");
        assert_eq!(PlaygroundError::Closed.to_string(), "playground loop has shut down");
    }
}
