//! Job runner service for processing background jobs.
//!
//! The `JobRunner` is the worker loop:
//! - Polls the queue for ready jobs
//! - Deserializes and executes them via the registry
//! - Marks succeeded/failed (the queue handles retries)
//! - Drains the queue on shutdown
//!
//! # Architecture
//!
//! ```text
//! JobRunner
//!     │
//!     ├─► claim jobs via JobQueue
//!     ├─► execute via JobRegistry (deserialize + call handler)
//!     └─► mark succeeded/failed (queue applies the retry budget)
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::job::ErrorKind;
use super::queue::JobQueue;
use super::registry::SharedJobRegistry;
use crate::kernel::deps::WorkerDeps;

/// Configuration for the job runner.
#[derive(Debug, Clone)]
pub struct JobRunnerConfig {
    /// Maximum number of jobs to claim at once
    pub batch_size: usize,
    /// How long to wait when no jobs are available
    pub poll_interval: Duration,
    /// How long shutdown waits for in-flight work to drain
    pub shutdown_grace: Duration,
    /// Worker ID for this instance
    pub worker_id: String,
}

impl Default for JobRunnerConfig {
    fn default() -> Self {
        Self {
            // One job at a time keeps each account's chain strictly ordered.
            batch_size: 1,
            poll_interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(5),
            worker_id: format!("worker-{}", Uuid::new_v4()),
        }
    }
}

impl JobRunnerConfig {
    /// Create a new config with a specific worker ID.
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }
}

/// Background service that processes jobs from the queue.
///
/// Shutdown is driven by the `CancellationToken` in [`WorkerDeps`], so a
/// cancel also aborts any pacing wait inside a handler.
pub struct JobRunner {
    job_queue: Arc<dyn JobQueue>,
    registry: SharedJobRegistry,
    deps: Arc<WorkerDeps>,
    config: JobRunnerConfig,
}

impl JobRunner {
    /// Create a new job runner with default configuration.
    pub fn new(job_queue: Arc<dyn JobQueue>, registry: SharedJobRegistry, deps: Arc<WorkerDeps>) -> Self {
        Self {
            job_queue,
            registry,
            deps,
            config: JobRunnerConfig::default(),
        }
    }

    /// Create with custom configuration.
    pub fn with_config(
        job_queue: Arc<dyn JobQueue>,
        registry: SharedJobRegistry,
        deps: Arc<WorkerDeps>,
        config: JobRunnerConfig,
    ) -> Self {
        Self {
            job_queue,
            registry,
            deps,
            config,
        }
    }

    /// Token that stops the runner when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.deps.shutdown.clone()
    }

    /// Run the worker loop until the shutdown token is cancelled, then drain
    /// the queue within the configured grace period.
    pub async fn run(self) -> Result<()> {
        let shutdown = self.deps.shutdown.clone();

        info!(
            worker_id = %self.config.worker_id,
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "job runner starting"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let jobs = match self
                .job_queue
                .claim(&self.config.worker_id, self.config.batch_size)
                .await
            {
                Ok(jobs) => jobs,
                Err(e) => {
                    // Queue trouble is not fatal; log and keep polling.
                    error!(error = %e, "failed to claim jobs");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                    continue;
                }
            };

            if jobs.is_empty() {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
                continue;
            }

            debug!(count = jobs.len(), "claimed jobs");

            for job in jobs {
                let job_id = job.id;
                let job_type = job.command_type().to_string();

                if shutdown.is_cancelled() {
                    // Claimed but never started; hand it back for redelivery.
                    if let Err(e) = self
                        .job_queue
                        .mark_failed(job_id, "shutdown before execution", ErrorKind::Shutdown)
                        .await
                    {
                        error!(job_id = %job_id, error = %e, "failed to release job on shutdown");
                    }
                    continue;
                }

                debug!(job_id = %job_id, job_type = %job_type, "executing job");

                let result = self.registry.execute(&job, self.deps.clone()).await;

                match result {
                    Ok(()) => {
                        info!(job_id = %job_id, job_type = %job_type, "job succeeded");
                        if let Err(e) = self.job_queue.mark_succeeded(job_id).await {
                            error!(job_id = %job_id, error = %e, "failed to mark job as succeeded");
                        }
                    }
                    Err(e) => {
                        warn!(job_id = %job_id, job_type = %job_type, error = %e, "job failed");

                        let error_kind = classify_error(&e);

                        if let Err(mark_err) = self
                            .job_queue
                            .mark_failed(job_id, &e.to_string(), error_kind)
                            .await
                        {
                            error!(job_id = %job_id, error = %mark_err, "failed to mark job as failed");
                        }
                    }
                }
            }
        }

        info!(worker_id = %self.config.worker_id, "job runner stopping, draining queue");
        self.job_queue.shutdown(self.config.shutdown_grace).await?;
        info!(worker_id = %self.config.worker_id, "job runner stopped");
        Ok(())
    }

    /// Run until a shutdown signal is received.
    ///
    /// Convenience method that listens for Ctrl+C and cancels the token.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown_token();

        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            shutdown.cancel();
        });

        self.run().await
    }
}

/// Classify an error to determine retry behavior.
///
/// Transport and remote-API failures are retryable; the queue's attempt
/// budget is the recovery mechanism. Malformed payloads and references to
/// accounts that are not configured can never succeed.
fn classify_error(error: &anyhow::Error) -> ErrorKind {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("shutdown") {
        return ErrorKind::Shutdown;
    }

    if error_str.contains("unknown account")
        || error_str.contains("unknown job type")
        || error_str.contains("deserialize")
        || error_str.contains("has no args")
    {
        return ErrorKind::NonRetryable;
    }

    ErrorKind::Retryable
}
