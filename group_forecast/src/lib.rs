//! # Group Forecast
//!
//! A Rust library for training one forecasting model per group of a wide
//! retail sales table.
//!
//! ## Features
//!
//! - Loading and validating the calendar, sales and sell price tables
//! - A catalog of twelve aggregation levels (state, store, category, item...)
//! - Partitioning the sales table into groups at a level
//! - Sliding-window tensors with calendar features and min-max scaling
//! - Pluggable trainers (linear window regression, moving average,
//!   exponential smoothing, or any closure)
//! - Bounded concurrent execution with per-group failure isolation
//! - Atomic per-group result files
//!
//! ## Pipeline
//!
//! For a configured model level, the [`Orchestrator`] partitions the sales
//! table, resets the [`ResultStore`] and schedules one job per group. Each
//! job builds its windows, trains, and hands the validation and prediction
//! tables back to be persisted as `<encoded key>_results.json`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use group_forecast::config::PipelineConfig;
//! use group_forecast::workflow::Orchestrator;
//!
//! let config = PipelineConfig::load("config.yaml")?;
//! let orchestrator = Orchestrator::from_config(config)?;
//!
//! // Train every group and persist the results
//! let report = orchestrator.run_from_disk()?;
//! println!("{}", report);
//!
//! // Read one group back
//! for key in orchestrator.store().list()? {
//!     let document = orchestrator.store().get(&key)?;
//!     println!("{}: {} series", key, document.pred_df.len());
//! }
//! # Ok::<(), group_forecast::PipelineError>(())
//! ```
//!
//! ## Custom trainers
//!
//! Any `Fn(&GroupKey, &WindowedDataset, usize) -> Result<RecordTable>`
//! closure is a [`Trainer`]:
//!
//! ```rust,no_run
//! use group_forecast::config::PipelineConfig;
//! use group_forecast::workflow::Orchestrator;
//! use group_forecast::{GroupKey, WindowedDataset};
//! use std::sync::Arc;
//!
//! let echo_actuals = |_key: &GroupKey, dataset: &WindowedDataset, _epochs: usize| {
//!     dataset.prediction_table(dataset.y_valid.view())
//! };
//! let _orchestrator = Orchestrator::new(PipelineConfig::new(3, 1), Arc::new(echo_actuals))?;
//! # Ok::<(), group_forecast::PipelineError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod levels;
pub mod metrics;
pub mod models;
pub mod partition;
pub mod preprocessing;
pub mod records;
pub mod scheduler;
pub mod store;
pub mod workflow;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::data::{RawTables, SalesTable, TableLoader};
pub use crate::error::{PipelineError, Result};
pub use crate::levels::{find_model_level, model_levels, ModelLevel};
pub use crate::models::{Trainer, TrainerKind};
pub use crate::partition::{GroupKey, GroupPartitioner, GroupSummary};
pub use crate::preprocessing::{WindowBuilder, WindowConfig, WindowedDataset};
pub use crate::records::RecordTable;
pub use crate::scheduler::{JobScheduler, RunSummary, ShutdownSignal};
pub use crate::store::{ResultDocument, ResultStore};
pub use crate::workflow::{Orchestrator, RunReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
