//! Job model for background command execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    DeadLetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transient error - will retry if attempts remain
    #[default]
    Retryable,
    /// Permanent error - will not retry
    NonRetryable,
    /// Job was interrupted by graceful shutdown - will retry
    Shutdown,
}

impl ErrorKind {
    /// Whether this error kind should trigger a retry
    pub fn should_retry(&self) -> bool {
        matches!(self, ErrorKind::Retryable | ErrorKind::Shutdown)
    }
}

// ============================================================================
// Job Model
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    // Core identity
    pub job_type: String,

    // Payload
    #[builder(default, setter(strip_option))]
    pub args: Option<serde_json::Value>,

    // Scheduling
    #[builder(default, setter(strip_option))]
    pub next_run_at: Option<DateTime<Utc>>,

    // Execution settings
    #[builder(default = 5)]
    pub max_retries: i32,
    #[builder(default = 0)]
    pub retry_count: i32,
    /// 1-based execution attempt (retry_count + 1).
    #[builder(default = 1)]
    pub attempt: i32,

    // State
    #[builder(default)]
    pub status: JobStatus,
    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,
    #[builder(default, setter(strip_option))]
    pub error_kind: Option<ErrorKind>,

    // Timestamps
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a pending job for a serialized command payload.
    pub fn for_command(
        job_type: &str,
        args: serde_json::Value,
        run_at: Option<DateTime<Utc>>,
        max_retries: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type: job_type.to_string(),
            args: Some(args),
            next_run_at: run_at,
            max_retries,
            retry_count: 0,
            attempt: 1,
            status: JobStatus::Pending,
            error_message: None,
            error_kind: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Whether the job is claimable at `now`.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        match self.next_run_at {
            None => true,
            Some(at) => at <= now,
        }
    }

    /// Create the retry copy of a failed job, scheduled for `run_at`.
    pub fn create_retry(&self, run_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type: self.job_type.clone(),
            args: self.args.clone(),
            next_run_at: Some(run_at),
            max_retries: self.max_retries,
            retry_count: self.retry_count + 1,
            attempt: self.attempt + 1,
            status: JobStatus::Pending,
            error_message: None,
            error_kind: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
