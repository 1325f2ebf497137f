//! Error types for the group_forecast crate

use polars::prelude::PolarsError;
use series_math::MathError;
use thiserror::Error;

/// Custom error types for the group_forecast crate
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid or missing configuration; aborts before scheduling
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Input tables missing expected columns; aborts before partitioning
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A group has too few day columns to build any window
    #[error(
        "Insufficient history for group {group}: {available} day columns, \
         need more than {required}"
    )]
    InsufficientHistory {
        group: String,
        available: usize,
        required: usize,
    },

    /// The trainer failed for one group
    #[error("Training error: {0}")]
    TrainingError(String),

    /// Writing a result failed
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// No persisted result for the requested group key
    #[error("No result stored for group {0}")]
    NotFound(String),

    /// Error related to data processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from series math
    #[error("Math error: {0}")]
    MathError(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PipelineError {
    /// Whether the error stops the whole run rather than a single group
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::ConfigError(_) | PipelineError::ValidationError(_)
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<PolarsError> for PipelineError {
    fn from(err: PolarsError) -> Self {
        PipelineError::PolarsError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}
