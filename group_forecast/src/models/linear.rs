//! Linear autoregressive model over flattened windows
//!
//! Each output series is a linear function of every value in the window.
//! Weights are fitted with mini-batch gradient descent on the training
//! windows; the validation loss after each epoch drives early stopping
//! and the best weights seen are kept.

use crate::error::{PipelineError, Result};
use crate::models::{predict_validation, Trainer};
use crate::partition::GroupKey;
use crate::preprocessing::WindowedDataset;
use crate::records::RecordTable;
use ndarray::{Array1, Array2, ArrayView2, ArrayView3, Axis};

/// Largest coefficient matrix a group may ask for, in `f64` entries (200 MB).
///
/// The matrix is `(n_training * features) x outputs` and features grow with
/// the outputs, so its size is quadratic in the series of a group. Groups
/// over the limit fail with a training error instead of exhausting memory.
pub const DEFAULT_MAX_COEFFICIENTS: usize = 25_000_000;

/// Gradient-descent linear window model
#[derive(Debug, Clone)]
pub struct LinearWindowTrainer {
    name: String,
    learning_rate: f64,
    batch_size: usize,
    clip_value: f64,
    patience: usize,
    max_coefficients: usize,
}

impl Default for LinearWindowTrainer {
    fn default() -> Self {
        Self {
            name: "Linear Window Regression".to_string(),
            learning_rate: 0.01,
            batch_size: 10,
            clip_value: 0.5,
            patience: 20,
            max_coefficients: DEFAULT_MAX_COEFFICIENTS,
        }
    }
}

impl LinearWindowTrainer {
    /// Override the learning rate
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Result<Self> {
        if !(learning_rate > 0.0 && learning_rate.is_finite()) {
            return Err(PipelineError::ConfigError(
                "Learning rate must be a positive number".to_string(),
            ));
        }
        self.learning_rate = learning_rate;
        Ok(self)
    }

    /// Override the mini-batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(PipelineError::ConfigError(
                "Batch size must be positive".to_string(),
            ));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    /// Override the coefficient limit
    pub fn with_max_coefficients(mut self, max_coefficients: usize) -> Self {
        self.max_coefficients = max_coefficients;
        self
    }

    /// Fit weights on the dataset's training windows
    pub fn fit(&self, dataset: &WindowedDataset, epochs: usize) -> Result<LinearWeights> {
        if epochs == 0 {
            return Err(PipelineError::ConfigError(
                "Epochs must be greater than zero".to_string(),
            ));
        }
        self.check_size(dataset.n_training() * dataset.n_features(), dataset.n_outputs())?;
        let x_train = flatten(dataset.x_train.view())?;
        let x_valid = flatten(dataset.x_valid.view())?;
        let y_train = &dataset.y_train;

        let mut weights = LinearWeights {
            coefficients: Array2::zeros((x_train.ncols(), y_train.ncols())),
            bias: y_train
                .mean_axis(Axis(0))
                .ok_or_else(|| PipelineError::TrainingError("No training windows".to_string()))?,
        };
        let mut best = weights.clone();
        let mut best_loss = weights.loss(x_valid.view(), dataset.y_valid.view());
        let mut stale_epochs = 0usize;

        for epoch in 0..epochs {
            let n = x_train.nrows();
            let mut start = 0;
            while start < n {
                let end = (start + self.batch_size).min(n);
                let xb = x_train.slice(ndarray::s![start..end, ..]);
                let yb = y_train.slice(ndarray::s![start..end, ..]);
                self.step(&mut weights, xb, yb);
                start = end;
            }

            let loss = weights.loss(x_valid.view(), dataset.y_valid.view());
            if loss < best_loss {
                best_loss = loss;
                best = weights.clone();
                stale_epochs = 0;
            } else {
                stale_epochs += 1;
                if stale_epochs >= self.patience {
                    tracing::debug!(epoch, best_loss, "early stopping");
                    break;
                }
            }
        }

        Ok(best)
    }

    // checked before anything proportional to the coefficient matrix is allocated
    fn check_size(&self, inputs: usize, outputs: usize) -> Result<()> {
        match inputs.checked_mul(outputs) {
            Some(n) if n <= self.max_coefficients => Ok(()),
            _ => Err(PipelineError::TrainingError(format!(
                "Group too large for {}: {} window values x {} series exceeds {} coefficients",
                self.name, inputs, outputs, self.max_coefficients
            ))),
        }
    }

    fn step(&self, weights: &mut LinearWeights, x: ArrayView2<f64>, y: ArrayView2<f64>) {
        let residual = weights.predict(x) - &y;
        let scale = 2.0 / x.nrows() as f64;
        let clip = self.clip_value;

        let grad_w = (x.t().dot(&residual) * scale).mapv(|g| g.clamp(-clip, clip));
        let grad_b = (residual.sum_axis(Axis(0)) * scale).mapv(|g| g.clamp(-clip, clip));

        weights.coefficients.scaled_add(-self.learning_rate, &grad_w);
        weights.bias.scaled_add(-self.learning_rate, &grad_b);
    }
}

/// Fitted coefficients, `[window values, outputs]`, and per-output bias
#[derive(Debug, Clone)]
pub struct LinearWeights {
    coefficients: Array2<f64>,
    bias: Array1<f64>,
}

impl LinearWeights {
    /// Predict rows of flattened windows
    pub fn predict(&self, x: ArrayView2<f64>) -> Array2<f64> {
        x.dot(&self.coefficients) + &self.bias
    }

    /// Mean squared error against `y`
    pub fn loss(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> f64 {
        let residual = self.predict(x) - &y;
        residual.mapv(|r| r * r).mean().unwrap_or(f64::INFINITY)
    }
}

fn flatten(windows: ArrayView3<f64>) -> Result<Array2<f64>> {
    let (n, steps, features) = windows.dim();
    windows
        .as_standard_layout()
        .into_owned()
        .into_shape((n, steps * features))
        .map_err(|e| PipelineError::TrainingError(e.to_string()))
}

impl Trainer for LinearWindowTrainer {
    fn train(&self, key: &GroupKey, dataset: &WindowedDataset, epochs: usize) -> Result<RecordTable> {
        let weights = self.fit(dataset, epochs)?;
        tracing::debug!(group = %key, trainer = %self.name, "fitted weights");

        predict_validation(dataset, |window| {
            let flat = window
                .as_standard_layout()
                .into_owned()
                .into_shape((1, window.len()))
                .map_err(|e| PipelineError::TrainingError(e.to_string()))?;
            Ok(weights.predict(flat.view()).row(0).to_vec())
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
