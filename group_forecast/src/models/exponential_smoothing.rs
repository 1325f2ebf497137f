//! Exponential smoothing baseline

use crate::error::{PipelineError, Result};
use crate::models::{predict_validation, Trainer};
use crate::partition::GroupKey;
use crate::preprocessing::WindowedDataset;
use crate::records::RecordTable;
use series_math::smoothing::ExponentialLevel;

/// Simple exponential smoothing over each window.
///
/// The forecast for the next day is the smoothed level at the end of the
/// window. Nothing is fitted, so `epochs` has no effect.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothingTrainer {
    name: String,
    alpha: f64,
}

impl ExponentialSmoothingTrainer {
    /// Create a new exponential smoothing trainer
    pub fn new(alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha > 1.0 {
            return Err(PipelineError::ConfigError(
                "Alpha must be in (0, 1]".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Exponential Smoothing (alpha={})", alpha),
            alpha,
        })
    }
}

impl Default for ExponentialSmoothingTrainer {
    fn default() -> Self {
        Self {
            name: "Exponential Smoothing (alpha=0.3)".to_string(),
            alpha: 0.3,
        }
    }
}

impl Trainer for ExponentialSmoothingTrainer {
    fn train(&self, _key: &GroupKey, dataset: &WindowedDataset, _epochs: usize) -> Result<RecordTable> {
        let n_outputs = dataset.n_outputs();
        predict_validation(dataset, |window| {
            (0..n_outputs)
                .map(|series| {
                    ExponentialLevel::over(self.alpha, window.column(series).iter().copied())
                        .map_err(PipelineError::from)
                })
                .collect()
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
