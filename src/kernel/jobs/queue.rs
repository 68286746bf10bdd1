//! Job queue gateway.
//!
//! The rest of the crate reaches the durable queue only through the
//! [`JobQueue`] trait. Typed commands implement [`CommandMeta`] and are
//! serialized on enqueue; [`ClaimedJob`] carries the raw payload back to the
//! registry for dispatch.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::job::{ErrorKind, Job};

/// A claimed job ready for execution.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    /// The job ID
    pub id: Uuid,
    /// The raw job record
    pub job: Job,
}

impl ClaimedJob {
    /// Deserialize the command payload.
    pub fn deserialize<C: DeserializeOwned>(&self) -> Result<C> {
        let args = self
            .job
            .args
            .as_ref()
            .ok_or_else(|| anyhow!("job {} has no args", self.id))?;
        serde_json::from_value(args.clone())
            .map_err(|e| anyhow!("failed to deserialize command: {}", e))
    }

    /// Get the command type (job_type)
    pub fn command_type(&self) -> &str {
        &self.job.job_type
    }
}

/// Metadata commands provide so the queue can store them.
pub trait CommandMeta {
    /// The command type name (used as job_type).
    fn command_type(&self) -> &'static str;

    /// Retry budget the queue enforces for this command.
    fn max_retries(&self) -> i32 {
        5
    }
}

/// Trait for job queue operations.
///
/// Implementations provide storage and delivery of serialized commands for
/// background execution. Retry policy lives behind `mark_failed`.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a fully built job record.
    ///
    /// Callers normally go through [`JobQueueExt::enqueue`] instead.
    async fn enqueue_raw(&self, job: Job) -> Result<Uuid>;

    /// Claim up to `limit` ready jobs for processing.
    async fn claim(&self, worker_id: &str, limit: usize) -> Result<Vec<ClaimedJob>>;

    /// Acknowledge a running job as completed.
    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()>;

    /// Report a running job as failed; the queue decides retry vs dead-letter
    /// from `kind` and the job's remaining budget.
    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<()>;

    /// Stop handing out claims and wait up to `grace` for running jobs.
    async fn shutdown(&self, grace: Duration) -> Result<()>;
}

/// Typed enqueue helpers layered over the object-safe [`JobQueue`].
#[async_trait]
pub trait JobQueueExt: JobQueue {
    /// Enqueue a command for immediate execution.
    async fn enqueue<C>(&self, command: C) -> Result<Uuid>
    where
        C: Serialize + CommandMeta + Send + 'static,
    {
        let args = serde_json::to_value(&command)?;
        let job = Job::for_command(command.command_type(), args, None, command.max_retries());
        self.enqueue_raw(job).await
    }

    /// Schedule a command for future execution.
    async fn schedule<C>(&self, command: C, run_at: DateTime<Utc>) -> Result<Uuid>
    where
        C: Serialize + CommandMeta + Send + 'static,
    {
        let args = serde_json::to_value(&command)?;
        let job = Job::for_command(
            command.command_type(),
            args,
            Some(run_at),
            command.max_retries(),
        );
        self.enqueue_raw(job).await
    }
}

impl<Q: JobQueue + ?Sized> JobQueueExt for Q {}
