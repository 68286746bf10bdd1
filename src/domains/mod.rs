//! Business domains.

pub mod follow;
