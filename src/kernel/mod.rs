//! Kernel - worker infrastructure shared by all domains.

pub mod deps;
pub mod jobs;
pub mod pacer;
pub mod social;
pub mod test_dependencies;

pub use deps::WorkerDeps;
pub use pacer::Pacer;
pub use social::{
    ConnectionsPage, Credentials, FoundPost, HttpSocialApi, SearchCursor, SearchPage, SocialApi,
    SocialError,
};
