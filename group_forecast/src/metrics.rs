//! Accuracy of a group's predictions against its validation slice

use crate::error::{PipelineError, Result};
use crate::records::RecordTable;
use serde::Serialize;
use std::fmt;

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

/// Calculate accuracy metrics for a forecast vs actual values
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(PipelineError::DataError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;
    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let rmse = (errors.iter().map(|e| e.powi(2)).sum::<f64>() / n).sqrt();

    // zero/zero days count as a perfect forecast
    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(&a, &f)| {
            let denom = a.abs() + f.abs();
            if denom == 0.0 {
                0.0
            } else {
                200.0 * (a - f).abs() / denom
            }
        })
        .sum::<f64>()
        / n;

    Ok(ForecastAccuracy { mae, rmse, smape })
}

/// Compare two record tables over `day_columns`, row by row
pub fn table_accuracy(
    validation: &RecordTable,
    prediction: &RecordTable,
    day_columns: &[String],
) -> Result<ForecastAccuracy> {
    if validation.len() != prediction.len() {
        return Err(PipelineError::DataError(format!(
            "Validation has {} rows, prediction has {}",
            validation.len(),
            prediction.len()
        )));
    }

    let mut actual = Vec::new();
    let mut forecast = Vec::new();
    for day in day_columns {
        for (a, f) in validation
            .numeric_column(day)
            .into_iter()
            .zip(prediction.numeric_column(day))
        {
            if let (Some(a), Some(f)) = (a, f) {
                actual.push(a);
                forecast.push(f);
            }
        }
    }

    forecast_accuracy(&forecast, &actual)
}

impl fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAE {:.4}  RMSE {:.4}  sMAPE {:.2}%",
            self.mae, self.rmse, self.smape
        )
    }
}
