//! Error types for the chaos-automl framework

use thiserror::Error;

/// Result type alias for chaos-automl operations
pub type Result<T> = std::result::Result<T, ChaosError>;

/// Main error type for the framework
#[derive(Error, Debug)]
pub enum ChaosError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Optimization error: {0}")]
    OptimizationError(String),

    /// Every candidate of a search failed; nothing is fit for retraining.
    #[error("No viable configuration found after {iterations} iterations")]
    NoViableConfiguration { iterations: usize },

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

    #[error("Preprocessor already fitted; fit runs once per pipeline")]
    AlreadyFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),
}

impl From<polars::error::PolarsError> for ChaosError {
    fn from(err: polars::error::PolarsError) -> Self {
        ChaosError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ChaosError {
    fn from(err: serde_json::Error) -> Self {
        ChaosError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for ChaosError {
    fn from(err: bincode::Error) -> Self {
        ChaosError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ChaosError {
    fn from(err: ndarray::ShapeError) -> Self {
        ChaosError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
