//! Side-effectful operations for the follow domain.

mod job_handlers;

pub use job_handlers::{
    handle_follow, handle_list_connections, handle_search, register_follow_jobs,
};
