//! Job registry for deserializing and executing jobs.
//!
//! Maps job type strings (e.g. "search") to handlers that reconstruct the
//! typed payload from JSON and run the domain logic. The runner claims raw
//! jobs and dispatches here without knowing concrete types; the deserialize
//! step doubles as the per-job fault boundary, so a malformed payload fails
//! only that job.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;

use super::queue::{ClaimedJob, CommandMeta};
use crate::kernel::deps::WorkerDeps;

/// Type alias for the async handler function.
///
/// The job payload arrives as JSON and is deserialized by the wrapper the
/// registry builds at registration time.
type BoxedHandler = Box<
    dyn Fn(serde_json::Value, Arc<WorkerDeps>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

struct JobRegistration {
    handler: BoxedHandler,
}

/// Registry that maps job type strings to handlers.
///
/// Each domain registers its job types at startup; the runner uses the
/// registry to deserialize and execute a claimed job in one step.
#[derive(Default)]
pub struct JobRegistry {
    registrations: HashMap<&'static str, JobRegistration>,
}

impl JobRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
        }
    }

    /// Register a job type with its handler.
    ///
    /// ```ignore
    /// registry.register::<SearchJob, _, _>(SearchJob::JOB_TYPE, |job, deps| async move {
    ///     handle_search(job, deps).await
    /// });
    /// ```
    pub fn register<J, F, Fut>(&mut self, job_type: &'static str, handler: F)
    where
        J: CommandMeta + DeserializeOwned + Send + Sync + 'static,
        F: Fn(J, Arc<WorkerDeps>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let boxed_handler: BoxedHandler = Box::new(move |value, deps| {
            let handler = handler.clone();
            Box::pin(async move {
                let job: J = serde_json::from_value(value)
                    .map_err(|e| anyhow!("failed to deserialize {}: {}", job_type, e))?;
                handler(job, deps).await
            })
        });

        self.registrations.insert(
            job_type,
            JobRegistration {
                handler: boxed_handler,
            },
        );
    }

    /// Execute a claimed job using its registered handler.
    ///
    /// Fails when the job type is unregistered, the payload does not
    /// deserialize, or the handler itself errors.
    pub async fn execute(&self, job: &ClaimedJob, deps: Arc<WorkerDeps>) -> Result<()> {
        let job_type = job.command_type();
        let registration = self
            .registrations
            .get(job_type)
            .ok_or_else(|| anyhow!("unknown job type: {}", job_type))?;

        let args = job
            .job
            .args
            .clone()
            .ok_or_else(|| anyhow!("job {} has no args", job.id))?;

        (registration.handler)(args, deps).await
    }

    /// Check if a job type is registered.
    pub fn is_registered(&self, job_type: &str) -> bool {
        self.registrations.contains_key(job_type)
    }

    /// Get all registered job types.
    pub fn registered_types(&self) -> Vec<&'static str> {
        self.registrations.keys().copied().collect()
    }
}

/// Thread-safe registry wrapped in Arc.
pub type SharedJobRegistry = Arc<JobRegistry>;
