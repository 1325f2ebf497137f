//! Trainers turning a group's windows into validation predictions

use crate::error::{PipelineError, Result};
use crate::partition::GroupKey;
use crate::preprocessing::WindowedDataset;
use crate::records::RecordTable;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

pub mod exponential_smoothing;
pub mod linear;
pub mod moving_average;

pub use exponential_smoothing::ExponentialSmoothingTrainer;
pub use linear::LinearWindowTrainer;
pub use moving_average::MovingAverageTrainer;

/// Fits a model on one group's windows and predicts its validation days.
///
/// The returned table has the group's identity columns and one numeric
/// column per validation day, in original units. Implementations must not
/// keep state between calls; one instance is shared by every worker.
pub trait Trainer: Send + Sync {
    /// Train on `dataset` and predict the validation horizon
    fn train(&self, key: &GroupKey, dataset: &WindowedDataset, epochs: usize) -> Result<RecordTable>;

    /// Name used in logs
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> Trainer for F
where
    F: Fn(&GroupKey, &WindowedDataset, usize) -> Result<RecordTable> + Send + Sync,
{
    fn train(&self, key: &GroupKey, dataset: &WindowedDataset, epochs: usize) -> Result<RecordTable> {
        self(key, dataset, epochs)
    }
}

/// Trainers selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainerKind {
    #[default]
    Linear,
    MovingAverage,
    ExponentialSmoothing,
}

impl TrainerKind {
    /// Instantiate the trainer with its default parameters
    pub fn build(self) -> Arc<dyn Trainer> {
        match self {
            TrainerKind::Linear => Arc::new(LinearWindowTrainer::default()),
            TrainerKind::MovingAverage => Arc::new(MovingAverageTrainer::default()),
            TrainerKind::ExponentialSmoothing => Arc::new(ExponentialSmoothingTrainer::default()),
        }
    }
}

/// Predict every validation window with `predict_window` and de-scale.
///
/// `predict_window` receives one `[n_training, features]` window and
/// returns the scaled next-step value of each output series.
pub fn predict_validation<F>(dataset: &WindowedDataset, mut predict_window: F) -> Result<RecordTable>
where
    F: FnMut(ArrayView2<f64>) -> Result<Vec<f64>>,
{
    let n_outputs = dataset.n_outputs();
    let n_windows = dataset.x_valid.shape()[0];
    let mut scaled = Array2::<f64>::zeros((n_windows, n_outputs));

    for (idx, window) in dataset.x_valid.outer_iter().enumerate() {
        let prediction = predict_window(window)?;
        if prediction.len() != n_outputs {
            return Err(PipelineError::TrainingError(format!(
                "Window prediction has {} values, expected {}",
                prediction.len(),
                n_outputs
            )));
        }
        for (col, value) in prediction.into_iter().enumerate() {
            scaled[[idx, col]] = value;
        }
    }

    dataset.prediction_table(scaled.view())
}
