//! End-to-end run: partition, build, train and persist every group

use crate::config::PipelineConfig;
use crate::data::{RawTables, SalesTable, TableLoader};
use crate::error::Result;
use crate::levels::ALL_COLUMN;
use crate::metrics::{table_accuracy, ForecastAccuracy};
use crate::models::Trainer;
use crate::partition::{GroupKey, GroupPartitioner, GroupSummary};
use crate::preprocessing::WindowBuilder;
use crate::records::RecordTable;
use crate::scheduler::{JobScheduler, JobStage, RunSummary, ShutdownSignal, StageError};
use crate::store::ResultStore;
use std::fmt;
use std::sync::Arc;

/// Outcome of a full run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Series per group at the configured level
    pub partition: GroupSummary,
    pub summary: RunSummary,
    /// Accuracy of each persisted group, in completion order
    pub accuracy: Vec<(GroupKey, ForecastAccuracy)>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.partition)?;
        write!(f, "{}", self.summary)?;
        for (key, accuracy) in &self.accuracy {
            writeln!(f, "  {:<32} {}", key.to_string(), accuracy)?;
        }
        Ok(())
    }
}

struct GroupResult {
    valid_df: RecordTable,
    pred_df: RecordTable,
    accuracy: Option<ForecastAccuracy>,
}

/// Drives one pipeline run for a configuration and trainer
pub struct Orchestrator {
    config: PipelineConfig,
    trainer: Arc<dyn Trainer>,
    store: ResultStore,
    shutdown: ShutdownSignal,
}

impl Orchestrator {
    /// Validate `config` and open its result store
    pub fn new(config: PipelineConfig, trainer: Arc<dyn Trainer>) -> Result<Self> {
        config.validate()?;
        let store = ResultStore::new(&config.results_dir)?;
        Ok(Self {
            config,
            trainer,
            store,
            shutdown: ShutdownSignal::new(),
        })
    }

    /// Orchestrator using the trainer named in `config`
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let trainer = config.trainer.build();
        Self::new(config, trainer)
    }

    /// Stop submitting groups once `shutdown` is triggered
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Load the input tables from the configured data directory and run
    pub fn run_from_disk(&self) -> Result<RunReport> {
        let tables = TableLoader::new(&self.config.data_dir)
            .with_sales_row_limit(self.config.sales_row_limit)
            .load()?;
        self.run(tables)
    }

    /// Run every group of the configured level.
    ///
    /// Configuration and table problems abort before any job starts.
    /// After that a group's failure never affects the others.
    pub fn run(&self, tables: RawTables) -> Result<RunReport> {
        let level = self.config.model_level()?;
        let RawTables {
            calendar,
            sales,
            sell_prices,
        } = tables;
        let builder = WindowBuilder::new(Arc::new(calendar), self.config.window_config())?;

        let (partition, groups) = GroupPartitioner::partition(&sales, level)?;
        tracing::info!(
            level = level.id(),
            trainer = self.trainer.name(),
            groups = partition.group_count(),
            sell_prices = sell_prices.row_count(),
            "starting run"
        );

        self.store.reset()?;

        let epochs = self.config.epochs;
        let trainer = &self.trainer;
        let builder = &builder;
        let work = move |key: &GroupKey, sales: SalesTable| -> std::result::Result<GroupResult, StageError> {
            let sales = sales
                .without_column(ALL_COLUMN)
                .map_err(StageError::at(JobStage::Build))?;
            let dataset = builder.build(key, &sales).map_err(StageError::at(JobStage::Build))?;

            let pred_df = trainer
                .train(key, &dataset, epochs)
                .map_err(StageError::at(JobStage::Train))?;
            dataset
                .check_predictions(&pred_df)
                .map_err(StageError::at(JobStage::Train))?;

            let valid_df = dataset.validation_table().clone();
            let accuracy = match table_accuracy(&valid_df, &pred_df, dataset.valid_day_columns()) {
                Ok(accuracy) => {
                    tracing::info!(group = %key, %accuracy, "validation accuracy");
                    Some(accuracy)
                }
                Err(err) => {
                    tracing::warn!(group = %key, error = %err, "accuracy not computed");
                    None
                }
            };
            Ok(GroupResult {
                valid_df,
                pred_df,
                accuracy,
            })
        };

        let mut accuracy = Vec::new();
        let store = &self.store;
        let on_complete = |key: &GroupKey, result: GroupResult| -> Result<()> {
            store.put(key, &result.valid_df, &result.pred_df)?;
            if let Some(acc) = result.accuracy {
                accuracy.push((key.clone(), acc));
            }
            Ok(())
        };

        let jobs = groups.into_iter().map(|g| (g.key, g.sales)).collect();
        let summary = JobScheduler::new(self.config.concurrency())
            .with_shutdown(self.shutdown.clone())
            .run(jobs, work, on_complete)?;

        Ok(RunReport {
            partition,
            summary,
            accuracy,
        })
    }
}
