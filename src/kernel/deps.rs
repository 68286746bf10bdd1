//! Worker dependency container.
//!
//! Job handlers receive everything they need through [`WorkerDeps`]; the
//! trait objects make handlers testable against mocks.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domains::follow::models::AccountRegistry;
use crate::kernel::jobs::JobQueue;
use crate::kernel::pacer::Pacer;
use crate::kernel::social::SocialApi;

/// Dependencies accessible to job handlers.
#[derive(Clone)]
pub struct WorkerDeps {
    /// Queue handlers chain follow-on jobs into.
    pub jobs: Arc<dyn JobQueue>,
    /// Remote social API client.
    pub social: Arc<dyn SocialApi>,
    /// Configured accounts and their crawl state.
    pub accounts: Arc<AccountRegistry>,
    /// Per-account pacing.
    pub pacer: Pacer,
    /// Cancelled on process shutdown; aborts pacing waits in flight.
    pub shutdown: CancellationToken,
}

impl WorkerDeps {
    pub fn new(
        jobs: Arc<dyn JobQueue>,
        social: Arc<dyn SocialApi>,
        accounts: Arc<AccountRegistry>,
        pacer: Pacer,
    ) -> Self {
        Self {
            jobs,
            social,
            accounts,
            pacer,
            shutdown: CancellationToken::new(),
        }
    }
}
