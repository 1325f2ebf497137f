//! # SalesOwl
//!
//! `sales_owl` ties the workspace together: it re-exports the pipeline
//! crates and holds the pieces of the command line that are worth testing
//! on their own.
//!
//! ## Example
//!
//! ```
//! use sales_owl::{ConfigOverrides, PipelineConfig};
//!
//! let overrides = ConfigOverrides {
//!     results_dir: Some("out".into()),
//!     ..ConfigOverrides::default()
//! };
//! let config = overrides.apply(PipelineConfig::new(3, 10));
//! assert_eq!(config.results_dir, std::path::PathBuf::from("out"));
//! ```

pub use group_forecast::{self, GroupKey, PipelineConfig, PipelineError, ResultStore, ShutdownSignal};
pub use series_math;

use std::path::PathBuf;

/// Values given on the command line that replace configured ones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
    pub max_concurrency: Option<usize>,
}

impl ConfigOverrides {
    /// Replace the configured values that have an override
    pub fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.results_dir {
            config.results_dir = dir.clone();
        }
        if let Some(n) = self.max_concurrency {
            config.max_concurrency = Some(n);
        }
        config
    }
}

/// Record an interrupt on `signal`.
///
/// Returns `false` when the signal was already raised, so a second
/// Ctrl-C can exit at once instead of waiting for in-flight groups.
pub fn interrupt(signal: &ShutdownSignal) -> bool {
    if signal.is_triggered() {
        return false;
    }
    signal.trigger();
    true
}

/// Key from the group-by values typed by the user.
///
/// A single argument containing `+` or `%` is read as an encoded key, so
/// names copied from result filenames work too.
pub fn parse_group_key(values: &[String]) -> group_forecast::Result<GroupKey> {
    match values {
        [] => Err(PipelineError::ConfigError(
            "At least one group value is required".to_string(),
        )),
        [single] if single.contains('+') || single.contains('%') => GroupKey::decode(single),
        values => Ok(GroupKey::new(values.iter().cloned())),
    }
}
