//! Job infrastructure for background command execution.
//!
//! ```text
//! Handlers ──enqueue──► JobQueue ──claim──► JobRunner ──dispatch──► JobRegistry
//!                          ▲                    │
//!                          └── mark_succeeded / mark_failed (retries)
//! ```
//!
//! Commands are plain serde structs implementing [`CommandMeta`]; the queue
//! stores them as [`Job`] records and the registry rebuilds the typed payload
//! at execution time.

mod job;
mod memory;
mod queue;
mod registry;
mod runner;

pub use job::{ErrorKind, Job, JobStatus};
pub use memory::MemoryJobQueue;
pub use queue::{ClaimedJob, CommandMeta, JobQueue, JobQueueExt};
pub use registry::{JobRegistry, SharedJobRegistry};
pub use runner::{JobRunner, JobRunnerConfig};
