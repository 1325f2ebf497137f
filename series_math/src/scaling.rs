//! Min-max feature scaling
//!
//! The scaler learns a per-column minimum and maximum from one matrix
//! (rows = time steps, columns = features) and maps every column into the
//! target range with an exact inverse. A column whose range is zero maps to
//! the lower bound of the target range instead of dividing by zero.

use crate::{MathError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Fitted min-max transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    range_min: f64,
    range_max: f64,
    data_min: Array1<f64>,
    data_max: Array1<f64>,
}

impl MinMaxScaler {
    /// Fit a scaler with target range [0, 1]
    pub fn fit(data: ArrayView2<f64>) -> Result<Self> {
        Self::fit_with_range(data, (0.0, 1.0))
    }

    /// Fit a scaler with a custom target range
    pub fn fit_with_range(data: ArrayView2<f64>, range: (f64, f64)) -> Result<Self> {
        let (range_min, range_max) = range;
        if !(range_min < range_max) {
            return Err(MathError::InvalidInput(format!(
                "Feature range must be increasing, got ({}, {})",
                range_min, range_max
            )));
        }
        if data.nrows() == 0 {
            return Err(MathError::InsufficientData(
                "Cannot fit a scaler on zero rows".to_string(),
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Scaler input contains non-finite values".to_string(),
            ));
        }

        let data_min = data.fold_axis(Axis(0), f64::INFINITY, |acc, &v| acc.min(v));
        let data_max = data.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &v| acc.max(v));

        Ok(Self {
            range_min,
            range_max,
            data_min,
            data_max,
        })
    }

    /// Number of feature columns the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.data_min.len()
    }

    /// Per-column minimum learned during fitting
    pub fn data_min(&self) -> ArrayView1<f64> {
        self.data_min.view()
    }

    /// Per-column maximum learned during fitting
    pub fn data_max(&self) -> ArrayView1<f64> {
        self.data_max.view()
    }

    /// Scale a single value of the given column
    pub fn transform_value(&self, column: usize, value: f64) -> f64 {
        let span = self.data_max[column] - self.data_min[column];
        if span == 0.0 {
            return self.range_min;
        }
        let unit = (value - self.data_min[column]) / span;
        self.range_min + unit * (self.range_max - self.range_min)
    }

    /// Undo the scaling of a single value of the given column
    pub fn inverse_value(&self, column: usize, value: f64) -> f64 {
        let span = self.data_max[column] - self.data_min[column];
        if span == 0.0 {
            return self.data_min[column];
        }
        let unit = (value - self.range_min) / (self.range_max - self.range_min);
        self.data_min[column] + unit * span
    }

    /// Scale every column of `data` with the fitted parameters
    pub fn transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;
        let mut out = data.to_owned();
        for (column, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
            col.mapv_inplace(|v| self.transform_value(column, v));
        }
        Ok(out)
    }

    /// Map scaled values back to the original units
    pub fn inverse_transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;
        let mut out = data.to_owned();
        for (column, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
            col.mapv_inplace(|v| self.inverse_value(column, v));
        }
        Ok(out)
    }

    /// Inverse-scale a row that only holds the leading `row.len()` columns.
    ///
    /// Predictions cover the output series only, which are the first
    /// columns of the fitted matrix.
    pub fn inverse_leading(&self, row: ArrayView1<f64>) -> Result<Array1<f64>> {
        if row.len() > self.n_features() {
            return Err(MathError::ShapeMismatch {
                expected: format!("at most {} columns", self.n_features()),
                actual: format!("{} columns", row.len()),
            });
        }
        Ok(Array1::from_iter(
            row.iter()
                .enumerate()
                .map(|(column, &v)| self.inverse_value(column, v)),
        ))
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.n_features() {
            return Err(MathError::ShapeMismatch {
                expected: format!("{} columns", self.n_features()),
                actual: format!("{} columns", width),
            });
        }
        Ok(())
    }
}
