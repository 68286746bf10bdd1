//! Per-account pacing.
//!
//! Keeps any one account from executing more than one job inside its delay
//! window. Early jobs are not rejected; they are stretched with a randomized
//! backoff, which smooths bursts without reordering an account's chain.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Rate-limited scheduler for account-scoped work.
#[derive(Debug, Clone)]
pub struct Pacer {
    base_delay: Duration,
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(Duration::from_millis(60_000))
    }
}

impl Pacer {
    pub fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// How long a job must wait given the time elapsed since the account's
    /// previous execution. `None` means run immediately.
    ///
    /// The backoff is `base_delay + jitter(0, base_delay / 2) - elapsed`,
    /// which always lands the execution at least `base_delay` after the
    /// previous one. The value is computed once; callers sleep exactly this
    /// long without re-checking.
    pub fn backoff_after(&self, elapsed: Duration) -> Option<Duration> {
        if elapsed > self.base_delay {
            return None;
        }

        let base_ms = self.base_delay.as_millis() as u64;
        let jitter_ms = if base_ms >= 2 {
            fastrand::u64(0..base_ms / 2)
        } else {
            0
        };
        let target_ms = base_ms + jitter_ms;
        let backoff_ms = target_ms.saturating_sub(elapsed.as_millis() as u64);
        Some(Duration::from_millis(backoff_ms))
    }

    /// Hold the current job until the account's slot opens, or until the
    /// shutdown token fires.
    ///
    /// Returns `Err` when cancelled; the job then reports as interrupted and
    /// the queue redelivers it after restart. Does not mutate the account's
    /// timestamp.
    pub async fn wait_turn(
        &self,
        last_job_time: DateTime<Utc>,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        let elapsed = (Utc::now() - last_job_time)
            .to_std()
            .unwrap_or(Duration::ZERO);

        let Some(backoff) = self.backoff_after(elapsed) else {
            return Ok(());
        };
        if backoff.is_zero() {
            return Ok(());
        }

        debug!(backoff_ms = backoff.as_millis() as u64, "pacing job");
        tokio::select! {
            _ = shutdown.cancelled() => anyhow::bail!("shutdown requested during pacing wait"),
            _ = tokio::time::sleep(backoff) => Ok(()),
        }
    }
}
