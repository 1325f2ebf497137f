//! Pipeline configuration loaded from YAML

use crate::error::{PipelineError, Result};
use crate::levels::{find_model_level, ModelLevel};
use crate::models::TrainerKind;
use crate::preprocessing::WindowConfig;
use crate::scheduler::default_concurrency;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Settings of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Model level id, 1 to 12
    pub model_level: u32,
    /// Training epochs per group
    pub epochs: usize,
    #[serde(default = "default_window_length")]
    pub n_training: usize,
    #[serde(default = "default_window_length")]
    pub n_forecast: usize,
    /// Jobs in flight; unset means one less than the available cores
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Keep only the first rows of the sales table
    #[serde(default)]
    pub sales_row_limit: Option<usize>,
    #[serde(default)]
    pub trainer: TrainerKind,
    /// Missing calendar days fail the group instead of reading as zero
    #[serde(default)]
    pub strict_calendar: bool,
}

fn default_window_length() -> usize {
    28
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("./results")
}

impl PipelineConfig {
    /// Configuration with defaults for everything but the required keys
    pub fn new(model_level: u32, epochs: usize) -> Self {
        Self {
            model_level,
            epochs,
            n_training: default_window_length(),
            n_forecast: default_window_length(),
            max_concurrency: None,
            data_dir: default_data_dir(),
            results_dir: default_results_dir(),
            sales_row_limit: None,
            trainer: TrainerKind::default(),
            strict_calendar: false,
        }
    }

    /// Read and validate a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&text)?;
        tracing::info!(path = %path.display(), model_level = config.model_level, "loaded configuration");
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| PipelineError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialise back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| PipelineError::SerializationError(e.to_string()))
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        find_model_level(self.model_level)?;
        if self.epochs == 0 {
            return Err(PipelineError::ConfigError(
                "epochs must be greater than zero".to_string(),
            ));
        }
        if self.n_training == 0 || self.n_forecast == 0 {
            return Err(PipelineError::ConfigError(
                "n_training and n_forecast must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrency == Some(0) {
            return Err(PipelineError::ConfigError(
                "max_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.sales_row_limit == Some(0) {
            return Err(PipelineError::ConfigError(
                "sales_row_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured model level
    pub fn model_level(&self) -> Result<&'static ModelLevel> {
        find_model_level(self.model_level)
    }

    /// Effective job bound
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or_else(default_concurrency)
    }

    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            n_training: self.n_training,
            n_forecast: self.n_forecast,
            strict_calendar: self.strict_calendar,
        }
    }
}
