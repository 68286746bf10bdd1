// Followbot - incremental social graph crawler
//
// Searches for posts matching each configured account's query, follows the
// authors it discovers, and keeps a per-account view of existing connections
// so the same entity is never followed twice. All work flows through a job
// queue consumed by a single worker loop; completed jobs chain the next ones.

pub mod config;
pub mod domains;
pub mod kernel;

pub use config::Config;
