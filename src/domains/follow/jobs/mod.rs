//! Job payloads for the follow domain.
//!
//! One struct per job kind; the set is closed. Payloads are plain serde
//! structs so they survive the queue round trip.

mod follow;
mod list_connections;
mod search;

pub use follow::FollowJob;
pub use list_connections::ListConnectionsJob;
pub use search::SearchJob;
