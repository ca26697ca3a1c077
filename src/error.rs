//! Error types for the complaint outcome pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ComplaintError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum ComplaintError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Convergence failed after {iterations} iterations")]
    ConvergenceError { iterations: usize },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<polars::error::PolarsError> for ComplaintError {
    fn from(err: polars::error::PolarsError) -> Self {
        ComplaintError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ComplaintError {
    fn from(err: serde_json::Error) -> Self {
        ComplaintError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ComplaintError {
    fn from(err: ndarray::ShapeError) -> Self {
        ComplaintError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ComplaintError::DataError("bad date".to_string());
        assert_eq!(err.to_string(), "Data error: bad date");

        let err = ComplaintError::ConvergenceError { iterations: 35 };
        assert_eq!(err.to_string(), "Convergence failed after 35 iterations");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ComplaintError = io_err.into();
        assert!(matches!(err, ComplaintError::IoError(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ComplaintError = json_err.into();
        assert!(matches!(err, ComplaintError::SerializationError(_)));
    }
}
