//! Turning one group's sales rows into scaled sliding-window tensors
//!
//! The group table is transposed so every day becomes a row and every
//! series a column, calendar features are appended as extra columns, the
//! matrix is min-max scaled with parameters learned on the training days
//! only, and fixed-length windows are cut for training and validation.

use crate::data::{CalendarTable, SalesTable, EXOGENOUS_COLUMNS};
use crate::error::{PipelineError, Result};
use crate::partition::GroupKey;
use crate::records::RecordTable;
use ndarray::{concatenate, s, Array2, Array3, ArrayView2, Axis};
use series_math::{sliding_windows, MinMaxScaler};
use std::sync::Arc;

/// Window geometry and merge policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Rows per input window
    pub n_training: usize,
    /// Trailing days held out for validation
    pub n_forecast: usize,
    /// Fail instead of zero-filling when a day has no calendar row
    pub strict_calendar: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            n_training: 28,
            n_forecast: 28,
            strict_calendar: false,
        }
    }
}

/// Tensors and bookkeeping for one group
#[derive(Debug, Clone)]
pub struct WindowedDataset {
    /// Shape `[windows, n_training, features]`
    pub x_train: Array3<f64>,
    /// Shape `[windows, outputs]`
    pub y_train: Array2<f64>,
    /// Shape `[n_forecast, n_training, features]`
    pub x_valid: Array3<f64>,
    /// Shape `[n_forecast, outputs]`
    pub y_valid: Array2<f64>,
    scaler: MinMaxScaler,
    fixed_columns: Vec<(String, Vec<String>)>,
    valid_day_columns: Vec<String>,
    validation_table: RecordTable,
}

impl WindowedDataset {
    /// Number of output series (`P`)
    pub fn n_outputs(&self) -> usize {
        self.y_train.ncols()
    }

    /// Columns per time step (`F`), series plus exogenous features
    pub fn n_features(&self) -> usize {
        self.x_train.shape()[2]
    }

    /// Rows per window
    pub fn n_training(&self) -> usize {
        self.x_train.shape()[1]
    }

    /// Scaler fitted on this group's training days
    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    /// Day columns of the validation slice
    pub fn valid_day_columns(&self) -> &[String] {
        &self.valid_day_columns
    }

    /// Identity columns plus validation days, in original units
    pub fn validation_table(&self) -> &RecordTable {
        &self.validation_table
    }

    /// Build the prediction table from scaled predictions.
    ///
    /// `scaled` has one row per validation day and one column per output
    /// series, in the same space as `y_valid`.
    pub fn prediction_table(&self, scaled: ArrayView2<f64>) -> Result<RecordTable> {
        let expected = (self.valid_day_columns.len(), self.n_outputs());
        if scaled.dim() != expected {
            return Err(PipelineError::TrainingError(format!(
                "Predictions have shape {:?}, expected {:?}",
                scaled.dim(),
                expected
            )));
        }

        let mut days = Vec::with_capacity(self.valid_day_columns.len());
        for (step, day) in self.valid_day_columns.iter().enumerate() {
            let restored = self.scaler.inverse_leading(scaled.row(step))?;
            days.push((day.clone(), restored.to_vec()));
        }
        Ok(RecordTable::from_columns(&self.fixed_columns, &days))
    }

    /// Check that a trainer's table covers every series and validation day
    pub fn check_predictions(&self, table: &RecordTable) -> Result<()> {
        if table.len() != self.n_outputs() {
            return Err(PipelineError::TrainingError(format!(
                "Prediction table has {} rows, expected {}",
                table.len(),
                self.n_outputs()
            )));
        }
        for day in &self.valid_day_columns {
            if table.numeric_column(day).iter().any(Option::is_none) {
                return Err(PipelineError::TrainingError(format!(
                    "Prediction table is missing values for '{}'",
                    day
                )));
            }
        }
        Ok(())
    }
}

/// Builds [`WindowedDataset`]s against a shared calendar
#[derive(Debug, Clone)]
pub struct WindowBuilder {
    calendar: Arc<CalendarTable>,
    config: WindowConfig,
}

impl WindowBuilder {
    /// Builder over a shared read-only calendar
    pub fn new(calendar: Arc<CalendarTable>, config: WindowConfig) -> Result<Self> {
        if config.n_training == 0 || config.n_forecast == 0 {
            return Err(PipelineError::ConfigError(
                "n_training and n_forecast must both be greater than zero".to_string(),
            ));
        }
        Ok(Self { calendar, config })
    }

    /// Window configuration
    pub fn config(&self) -> WindowConfig {
        self.config
    }

    /// Build the training and validation tensors for one group
    pub fn build(&self, key: &GroupKey, sales: &SalesTable) -> Result<WindowedDataset> {
        let WindowConfig {
            n_training,
            n_forecast,
            ..
        } = self.config;

        if sales.is_empty() {
            return Err(PipelineError::DataError(format!("Group {} has no sales rows", key)));
        }
        let days = sales.day_columns();
        let n_days = days.len();
        if n_days <= n_training + n_forecast {
            return Err(PipelineError::InsufficientHistory {
                group: key.to_string(),
                available: n_days,
                required: n_training + n_forecast,
            });
        }
        let n_train_days = n_days - n_forecast;

        // split: identity columns are carried onto the validation slice
        let fixed_columns = sales
            .fixed_columns()
            .into_iter()
            .map(|c| sales.text_column(&c).map(|v| (c, v)))
            .collect::<Result<Vec<_>>>()?;
        let units = sales.day_matrix()?;
        let valid_day_columns = days[n_train_days..].to_vec();
        let validation_table = RecordTable::from_columns(
            &fixed_columns,
            &valid_day_columns
                .iter()
                .enumerate()
                .map(|(i, day)| (day.clone(), units.column(n_train_days + i).to_vec()))
                .collect::<Vec<_>>(),
        );

        // rows = days, columns = series then exogenous features
        let exogenous = self.exogenous_matrix(key, days)?;
        let matrix = concatenate(Axis(1), &[units.t(), exogenous.view()])
            .map_err(|e| PipelineError::DataError(e.to_string()))?;
        let n_outputs = units.nrows();

        // the scaler only ever sees the training days
        let scaler = MinMaxScaler::fit(matrix.slice(s![..n_train_days, ..]))?;
        let scaled = scaler.transform(matrix.view())?;

        let train = sliding_windows(
            scaled.slice(s![..n_train_days, ..]),
            0..n_train_days - n_training,
            n_training,
            n_outputs,
        )?;
        // targets are exactly the final n_forecast days, context is real history
        let valid = sliding_windows(
            scaled.view(),
            n_days - n_forecast - n_training..n_days - n_training,
            n_training,
            n_outputs,
        )?;

        tracing::debug!(
            group = %key,
            series = n_outputs,
            features = matrix.ncols(),
            train_windows = train.len(),
            valid_windows = valid.len(),
            "built windows"
        );

        Ok(WindowedDataset {
            x_train: train.inputs,
            y_train: train.targets,
            x_valid: valid.inputs,
            y_valid: valid.targets,
            scaler,
            fixed_columns,
            valid_day_columns,
            validation_table,
        })
    }

    fn exogenous_matrix(&self, key: &GroupKey, days: &[String]) -> Result<Array2<f64>> {
        let mut exogenous = Array2::<f64>::zeros((days.len(), EXOGENOUS_COLUMNS.len()));
        let mut missing = 0usize;
        for (row, day) in days.iter().enumerate() {
            match self.calendar.features(day) {
                Some(features) => {
                    for (col, value) in features.to_array().into_iter().enumerate() {
                        exogenous[[row, col]] = value;
                    }
                }
                None if self.config.strict_calendar => {
                    return Err(PipelineError::ValidationError(format!(
                        "Calendar has no row for day '{}'",
                        day
                    )));
                }
                None => missing += 1,
            }
        }
        if missing > 0 {
            tracing::warn!(group = %key, missing, "days without a calendar row, exogenous features set to 0");
        }
        Ok(exogenous)
    }
}
