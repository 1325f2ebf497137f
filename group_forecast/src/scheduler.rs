//! Bounded concurrent execution of per-group jobs
//!
//! Jobs run on a dedicated rayon pool. The calling thread acts as the
//! coordinator: it never has more than `max_concurrency` jobs in flight,
//! handles each completion as soon as it arrives and stops submitting
//! once the shutdown signal is raised.

use crate::error::{PipelineError, Result};
use crate::partition::GroupKey;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use thiserror::Error;

/// Cooperative stop flag shared between the caller and the scheduler
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the scheduler to stop submitting new jobs
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One less than the available cores, at least one
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Where in its lifecycle a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStage {
    Build,
    Train,
    Persist,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Build => "build",
            JobStage::Train => "train",
            JobStage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// A job error tagged with its stage
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    pub stage: JobStage,
    #[source]
    pub source: PipelineError,
}

impl StageError {
    pub fn new(stage: JobStage, source: PipelineError) -> Self {
        Self { stage, source }
    }

    /// Tag errors of one stage, for use with `map_err`
    pub fn at(stage: JobStage) -> impl Fn(PipelineError) -> Self {
        move |source| Self::new(stage, source)
    }
}

/// A failed job as reported at the end of a run
#[derive(Debug, Clone, PartialEq)]
pub struct JobFailure {
    pub key: GroupKey,
    pub stage: JobStage,
    pub message: String,
}

/// End-of-run outcome per group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Keys whose result was persisted, in completion order
    pub succeeded: Vec<GroupKey>,
    pub failed: Vec<JobFailure>,
    /// Keys never submitted because of shutdown
    pub skipped: Vec<GroupKey>,
}

impl RunSummary {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn failed_keys(&self) -> Vec<&GroupKey> {
        self.failed.iter().map(|f| &f.key).collect()
    }

    /// Whether every submitted job succeeded and nothing was skipped
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Succeeded: {}  Failed: {}  Skipped: {}",
            self.succeeded_count(),
            self.failed_count(),
            self.skipped.len()
        )?;
        for failure in &self.failed {
            writeln!(f, "  FAILED {} [{}]: {}", failure.key, failure.stage, failure.message)?;
        }
        for key in &self.skipped {
            writeln!(f, "  SKIPPED {}", key)?;
        }
        Ok(())
    }
}

/// Runs jobs with at most `max_concurrency` in flight
#[derive(Debug, Clone)]
pub struct JobScheduler {
    max_concurrency: usize,
    shutdown: ShutdownSignal,
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new(default_concurrency())
    }
}

impl JobScheduler {
    /// Scheduler with the given bound, raised to 1 if zero
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Observe an external shutdown signal
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Run `work` for every job and hand each success to `on_complete`.
    ///
    /// `work` runs on pool threads; `on_complete` runs on the calling
    /// thread, one completion at a time. An error or panic in `work` fails
    /// only that job. An error from `on_complete` fails the job with
    /// [`JobStage::Persist`]. No job is retried.
    pub fn run<J, T, W, C>(&self, jobs: Vec<(GroupKey, J)>, work: W, mut on_complete: C) -> Result<RunSummary>
    where
        J: Send,
        T: Send,
        W: Fn(&GroupKey, J) -> std::result::Result<T, StageError> + Sync,
        C: FnMut(&GroupKey, T) -> Result<()>,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_concurrency)
            .thread_name(|idx| format!("group-worker-{}", idx))
            .build()
            .map_err(|e| PipelineError::ConfigError(format!("Cannot start worker pool: {}", e)))?;

        let total = jobs.len();
        tracing::info!(jobs = total, max_concurrency = self.max_concurrency, "scheduling jobs");

        let (tx, rx) = mpsc::channel::<(GroupKey, std::result::Result<T, StageError>)>();
        let work = &work;
        let mut summary = RunSummary::default();

        pool.in_place_scope(|scope| {
            let mut pending = jobs.into_iter();
            let mut in_flight = 0usize;

            loop {
                while in_flight < self.max_concurrency && !self.shutdown.is_triggered() {
                    let Some((key, job)) = pending.next() else {
                        break;
                    };
                    let tx = tx.clone();
                    tracing::debug!(group = %key, "job submitted");
                    scope.spawn(move |_| {
                        let outcome = catch_unwind(AssertUnwindSafe(|| work(&key, job)))
                            .unwrap_or_else(|panic| {
                                Err(StageError::new(
                                    JobStage::Train,
                                    PipelineError::TrainingError(format!(
                                        "worker panicked: {}",
                                        panic_message(panic.as_ref())
                                    )),
                                ))
                            });
                        // the coordinator outlives every job, a failed send cannot happen
                        let _ = tx.send((key, outcome));
                    });
                    in_flight += 1;
                }

                if in_flight == 0 {
                    break;
                }

                let Ok((key, outcome)) = rx.recv() else {
                    break;
                };
                in_flight -= 1;

                let outcome = outcome.and_then(|value| {
                    on_complete(&key, value).map_err(StageError::at(JobStage::Persist))
                });
                match outcome {
                    Ok(()) => {
                        tracing::info!(group = %key, "job succeeded");
                        summary.succeeded.push(key);
                    }
                    Err(err) => {
                        tracing::error!(group = %key, stage = %err.stage, error = %err.source, "job failed");
                        summary.failed.push(JobFailure {
                            key,
                            stage: err.stage,
                            message: err.source.to_string(),
                        });
                    }
                }
            }

            summary.skipped.extend(pending.map(|(key, _)| key));
        });

        if !summary.skipped.is_empty() {
            tracing::warn!(skipped = summary.skipped.len(), "shutdown requested, remaining jobs skipped");
        }
        tracing::info!(
            succeeded = summary.succeeded_count(),
            failed = summary.failed_count(),
            skipped = summary.skipped.len(),
            "run finished"
        );

        Ok(summary)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
