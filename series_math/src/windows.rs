//! Sliding-window sequence generation
//!
//! Turns a matrix of time steps × features into supervised pairs: each
//! input is `n_steps` consecutive rows and each target is the leading
//! `n_outputs` columns of the row right after the window.

use crate::{MathError, Result};
use ndarray::{s, Array2, Array3, ArrayView2};
use std::ops::Range;

/// Input/target pairs produced by [`sliding_windows`]
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPairs {
    /// Shape `[n_windows, n_steps, n_features]`
    pub inputs: Array3<f64>,
    /// Shape `[n_windows, n_outputs]`
    pub targets: Array2<f64>,
}

impl WindowPairs {
    /// Number of windows
    pub fn len(&self) -> usize {
        self.inputs.shape()[0]
    }

    /// Whether no window was produced
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows per window
    pub fn n_steps(&self) -> usize {
        self.inputs.shape()[1]
    }
}

/// Build windows for every start index in `starts`.
///
/// For a start `i` the input is `data[i..i + n_steps]` and the target is
/// `data[i + n_steps][..n_outputs]`. An empty range is an error so callers
/// never receive a silently empty training set.
pub fn sliding_windows(
    data: ArrayView2<f64>,
    starts: Range<usize>,
    n_steps: usize,
    n_outputs: usize,
) -> Result<WindowPairs> {
    if n_steps == 0 {
        return Err(MathError::InvalidInput(
            "Window length must be greater than zero".to_string(),
        ));
    }
    if n_outputs == 0 || n_outputs > data.ncols() {
        return Err(MathError::InvalidInput(format!(
            "Output count {} must be within 1..={}",
            n_outputs,
            data.ncols()
        )));
    }
    if starts.is_empty() {
        return Err(MathError::InsufficientData(format!(
            "No window fits: start range {:?} is empty for {} rows and window length {}",
            starts,
            data.nrows(),
            n_steps
        )));
    }
    if starts.end - 1 + n_steps >= data.nrows() {
        return Err(MathError::InsufficientData(format!(
            "Window starting at {} needs row {}, only {} rows available",
            starts.end - 1,
            starts.end - 1 + n_steps,
            data.nrows()
        )));
    }

    let n_windows = starts.len();
    let mut inputs = Array3::<f64>::zeros((n_windows, n_steps, data.ncols()));
    let mut targets = Array2::<f64>::zeros((n_windows, n_outputs));

    for (w, start) in starts.enumerate() {
        inputs
            .slice_mut(s![w, .., ..])
            .assign(&data.slice(s![start..start + n_steps, ..]));
        targets
            .row_mut(w)
            .assign(&data.slice(s![start + n_steps, ..n_outputs]));
    }

    Ok(WindowPairs { inputs, targets })
}
