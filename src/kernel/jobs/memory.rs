//! In-process job queue.
//!
//! Implements the [`JobQueue`] gateway with plain in-memory storage: FIFO
//! among ready jobs, exponential-backoff retries via `mark_failed`, and a
//! dead-letter list once the retry budget is spent. Suitable for a single
//! worker process; a durable backend would implement the same trait.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::job::{ErrorKind, Job, JobStatus};
use super::queue::{ClaimedJob, JobQueue};

/// Cap on the retry backoff exponent (2^n seconds).
const MAX_RETRY_DELAY_SECS: i64 = 3600;

#[derive(Default)]
struct QueueState {
    pending: Vec<Job>,
    running: HashMap<Uuid, Job>,
    dead: Vec<Job>,
    closed: bool,
}

#[derive(Default)]
pub struct MemoryJobQueue {
    state: Mutex<QueueState>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of pending jobs (any type).
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of dead-lettered jobs.
    pub fn dead_letter_len(&self) -> usize {
        self.lock().dead.len()
    }

    /// Snapshot of pending jobs of one type, oldest first.
    pub fn pending_of_type(&self, job_type: &str) -> Vec<Job> {
        self.lock()
            .pending
            .iter()
            .filter(|j| j.job_type == job_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue_raw(&self, job: Job) -> Result<Uuid> {
        let mut state = self.lock();
        if state.closed {
            return Err(anyhow!("queue is shut down"));
        }
        let id = job.id;
        state.pending.push(job);
        Ok(id)
    }

    async fn claim(&self, _worker_id: &str, limit: usize) -> Result<Vec<ClaimedJob>> {
        let mut state = self.lock();
        if state.closed {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut claimed = Vec::new();
        let mut i = 0;
        while i < state.pending.len() && claimed.len() < limit {
            if state.pending[i].is_ready(now) {
                let mut job = state.pending.remove(i);
                job.status = JobStatus::Running;
                job.updated_at = now;
                state.running.insert(job.id, job.clone());
                claimed.push(ClaimedJob { id: job.id, job });
            } else {
                i += 1;
            }
        }
        Ok(claimed)
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()> {
        let mut state = self.lock();
        state
            .running
            .remove(&job_id)
            .ok_or_else(|| anyhow!("job {job_id} is not running"))?;
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<()> {
        let mut state = self.lock();
        let mut job = state
            .running
            .remove(&job_id)
            .ok_or_else(|| anyhow!("job {job_id} is not running"))?;

        job.error_message = Some(error.to_string());
        job.error_kind = Some(kind);

        // retry_count counts consumed retries; the first attempt is free.
        if kind.should_retry() && job.retry_count < job.max_retries - 1 {
            let delay_secs = 2i64
                .checked_pow(job.retry_count as u32)
                .unwrap_or(MAX_RETRY_DELAY_SECS)
                .min(MAX_RETRY_DELAY_SECS);
            let retry = job.create_retry(Utc::now() + chrono::Duration::seconds(delay_secs));
            warn!(
                job_id = %job_id,
                job_type = %job.job_type,
                attempt = retry.attempt,
                delay_secs,
                error = %error,
                "job failed, retry scheduled"
            );
            state.pending.push(retry);
        } else {
            job.status = JobStatus::DeadLetter;
            warn!(
                job_id = %job_id,
                job_type = %job.job_type,
                attempt = job.attempt,
                error = %error,
                "job dead-lettered"
            );
            state.dead.push(job);
        }
        Ok(())
    }

    async fn shutdown(&self, grace: Duration) -> Result<()> {
        self.lock().closed = true;

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            if self.lock().running.is_empty() {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!("shutdown grace period elapsed with jobs still running");
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        info!("job queue shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::jobs::JobQueueExt;
    use serde::{Deserialize, Serialize};

    use super::super::queue::CommandMeta;

    #[derive(Debug, Serialize, Deserialize)]
    struct NoteCommand {
        note: String,
    }

    impl CommandMeta for NoteCommand {
        fn command_type(&self) -> &'static str {
            "note"
        }

        fn max_retries(&self) -> i32 {
            2
        }
    }

    fn note(text: &str) -> NoteCommand {
        NoteCommand {
            note: text.to_string(),
        }
    }

    #[tokio::test]
    async fn claims_ready_jobs_in_fifo_order() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(note("first")).await.unwrap();
        queue.enqueue(note("second")).await.unwrap();

        let claimed = queue.claim("w1", 10).await.unwrap();
        assert_eq!(claimed.len(), 2);
        let first: NoteCommand = claimed[0].deserialize().unwrap();
        let second: NoteCommand = claimed[1].deserialize().unwrap();
        assert_eq!(first.note, "first");
        assert_eq!(second.note, "second");
        assert_eq!(queue.pending_len(), 0);
    }

    #[tokio::test]
    async fn claim_respects_limit() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(note("a")).await.unwrap();
        queue.enqueue(note("b")).await.unwrap();

        let claimed = queue.claim("w1", 1).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(queue.pending_len(), 1);
    }

    #[tokio::test]
    async fn scheduled_jobs_are_not_claimable_early() {
        let queue = MemoryJobQueue::new();
        queue
            .schedule(note("later"), Utc::now() + chrono::Duration::minutes(5))
            .await
            .unwrap();

        let claimed = queue.claim("w1", 10).await.unwrap();
        assert!(claimed.is_empty());
        assert_eq!(queue.pending_len(), 1);
    }

    #[tokio::test]
    async fn retryable_failure_schedules_backoff_retry() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(note("flaky")).await.unwrap();

        let claimed = queue.claim("w1", 1).await.unwrap();
        queue
            .mark_failed(claimed[0].id, "remote hiccup", ErrorKind::Retryable)
            .await
            .unwrap();

        let pending = queue.pending_of_type("note");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].retry_count, 1);
        assert_eq!(pending[0].attempt, 2);
        assert!(pending[0].next_run_at.unwrap() > Utc::now());
        assert_eq!(queue.dead_letter_len(), 0);
    }

    #[tokio::test]
    async fn non_retryable_failure_dead_letters_immediately() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(note("broken")).await.unwrap();

        let claimed = queue.claim("w1", 1).await.unwrap();
        queue
            .mark_failed(claimed[0].id, "bad payload", ErrorKind::NonRetryable)
            .await
            .unwrap();

        assert_eq!(queue.pending_len(), 0);
        assert_eq!(queue.dead_letter_len(), 1);
    }

    #[tokio::test]
    async fn exhausted_retry_budget_dead_letters() {
        let queue = MemoryJobQueue::new();
        // Simulate the last allowed attempt of a max_retries=2 job.
        let mut job = Job::for_command("note", serde_json::json!({"note": "tired"}), None, 2);
        job.retry_count = 1;
        job.attempt = 2;
        queue.enqueue_raw(job).await.unwrap();

        let claimed = queue.claim("w1", 1).await.unwrap();
        queue
            .mark_failed(claimed[0].id, "still failing", ErrorKind::Retryable)
            .await
            .unwrap();

        assert_eq!(queue.pending_len(), 0);
        assert_eq!(queue.dead_letter_len(), 1);
    }

    #[tokio::test]
    async fn mark_succeeded_removes_running_job() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(note("done")).await.unwrap();
        let claimed = queue.claim("w1", 1).await.unwrap();

        queue.mark_succeeded(claimed[0].id).await.unwrap();
        assert!(queue.mark_succeeded(claimed[0].id).await.is_err());
    }

    #[tokio::test]
    async fn shutdown_rejects_new_work() {
        let queue = MemoryJobQueue::new();
        queue.shutdown(Duration::ZERO).await.unwrap();

        assert!(queue.enqueue(note("late")).await.is_err());
        assert!(queue.claim("w1", 1).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_running_job_up_to_grace() {
        let queue = std::sync::Arc::new(MemoryJobQueue::new());
        queue.enqueue(note("slow")).await.unwrap();
        let claimed = queue.claim("w1", 1).await.unwrap();
        let job_id = claimed[0].id;

        let finisher = {
            let queue = queue.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                queue.mark_succeeded(job_id).await.unwrap();
            })
        };

        queue.shutdown(Duration::from_secs(5)).await.unwrap();
        finisher.await.unwrap();
        assert_eq!(queue.lock().running.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_gives_up_after_grace() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(note("stuck")).await.unwrap();
        queue.claim("w1", 1).await.unwrap();

        // The running job is never acked; shutdown must still return.
        queue.shutdown(Duration::from_millis(100)).await.unwrap();
        assert_eq!(queue.lock().running.len(), 1);
    }
}
