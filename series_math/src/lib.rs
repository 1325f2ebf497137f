//! # Series Math
//!
//! Numerical building blocks for the per-group forecasting pipeline.
//! This crate provides the min-max scaler, sliding-window sequence
//! generation and the streaming smoothers used by the reference trainers.

use thiserror::Error;

pub mod scaling;
pub mod smoothing;
pub mod windows;

pub use scaling::MinMaxScaler;
pub use windows::{sliding_windows, WindowPairs};

/// Errors that can occur in series calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
