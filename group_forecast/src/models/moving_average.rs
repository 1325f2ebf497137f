//! Moving average baseline

use crate::error::{PipelineError, Result};
use crate::models::{predict_validation, Trainer};
use crate::partition::GroupKey;
use crate::preprocessing::WindowedDataset;
use crate::records::RecordTable;
use series_math::smoothing::SimpleMovingAverage;

/// Predicts each series as the mean of its last `window` steps.
///
/// Nothing is fitted, so `epochs` has no effect.
#[derive(Debug, Clone)]
pub struct MovingAverageTrainer {
    name: String,
    window: usize,
}

impl MovingAverageTrainer {
    /// Create a moving average trainer over `window` steps
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(PipelineError::ConfigError(
                "Moving average window must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Simple Moving Average (window={})", window),
            window,
        })
    }
}

impl Default for MovingAverageTrainer {
    fn default() -> Self {
        Self {
            name: "Simple Moving Average (window=7)".to_string(),
            window: 7,
        }
    }
}

impl Trainer for MovingAverageTrainer {
    fn train(&self, _key: &GroupKey, dataset: &WindowedDataset, _epochs: usize) -> Result<RecordTable> {
        let n_outputs = dataset.n_outputs();
        predict_validation(dataset, |window| {
            (0..n_outputs)
                .map(|series| {
                    SimpleMovingAverage::over(self.window, window.column(series).iter().copied())
                        .map_err(PipelineError::from)
                })
                .collect()
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
