//! Streaming smoothers used by the baseline trainers
//!
//! - Simple Moving Average (SMA)
//! - Exponential level (simple exponential smoothing)

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Simple Moving Average over the last `period` values
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Push a new value, evicting the oldest once the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Mean of the values currently held.
    ///
    /// Fewer than `period` values is accepted; the mean then covers what
    /// has been seen so far.
    pub fn value(&self) -> Result<f64> {
        if self.values.is_empty() {
            return Err(MathError::InsufficientData(
                "No values pushed into the moving average".to_string(),
            ));
        }
        Ok(self.sum / self.values.len() as f64)
    }

    /// Get the configured period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Mean of the last `period` entries of `values`
    pub fn over(period: usize, values: impl IntoIterator<Item = f64>) -> Result<f64> {
        let mut sma = Self::new(period)?;
        for v in values {
            sma.update(v);
        }
        sma.value()
    }
}

/// Simple exponential smoothing level
#[derive(Debug, Clone)]
pub struct ExponentialLevel {
    alpha: f64,
    level: Option<f64>,
}

impl ExponentialLevel {
    /// Create a smoother with factor `alpha` in (0, 1]
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(MathError::InvalidInput(format!(
                "Alpha must be in (0, 1], got {}",
                alpha
            )));
        }
        Ok(Self { alpha, level: None })
    }

    /// Fold a new observation into the level
    pub fn update(&mut self, value: f64) {
        self.level = Some(match self.level {
            None => value,
            Some(level) => self.alpha * value + (1.0 - self.alpha) * level,
        });
    }

    /// Current level
    pub fn value(&self) -> Result<f64> {
        self.level.ok_or_else(|| {
            MathError::InsufficientData("No values pushed into the smoother".to_string())
        })
    }

    /// Smoothing factor
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Level after folding all of `values`
    pub fn over(alpha: f64, values: impl IntoIterator<Item = f64>) -> Result<f64> {
        let mut smoother = Self::new(alpha)?;
        for v in values {
            smoother.update(v);
        }
        smoother.value()
    }
}
