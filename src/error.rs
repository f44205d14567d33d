//! Error types for the tabflow crate

use thiserror::Error;

/// Result type alias for tabflow operations
pub type Result<T> = std::result::Result<T, TabflowError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum TabflowError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Model '{0}' not supported")]
    UnsupportedModel(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl From<polars::error::PolarsError> for TabflowError {
    fn from(err: polars::error::PolarsError) -> Self {
        TabflowError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for TabflowError {
    fn from(err: serde_json::Error) -> Self {
        TabflowError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for TabflowError {
    fn from(err: bincode::Error) -> Self {
        TabflowError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TabflowError {
    fn from(err: ndarray::ShapeError) -> Self {
        TabflowError::ShapeError {
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
        let err = TabflowError::UnsupportedModel("catboost".to_string());
        assert_eq!(err.to_string(), "Model 'catboost' not supported");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TabflowError = io_err.into();
        assert!(matches!(err, TabflowError::IoError(_)));
    }
}
