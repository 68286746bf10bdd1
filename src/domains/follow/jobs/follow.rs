//! FollowJob - establish a connection to one discovered author.

use serde::{Deserialize, Serialize};

use crate::kernel::jobs::CommandMeta;

/// Follow a single target on behalf of an account. Terminal: success chains
/// no further jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowJob {
    pub account_id: String,
    pub target_id: u64,
}

impl FollowJob {
    pub const JOB_TYPE: &'static str = "follow";

    pub fn new(account_id: impl Into<String>, target_id: u64) -> Self {
        Self {
            account_id: account_id.into(),
            target_id,
        }
    }
}

impl CommandMeta for FollowJob {
    fn command_type(&self) -> &'static str {
        Self::JOB_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_through_json() {
        let job = FollowJob::new("alice", 42);
        let value = serde_json::to_value(&job).unwrap();
        let back: FollowJob = serde_json::from_value(value).unwrap();

        assert_eq!(back.account_id, "alice");
        assert_eq!(back.target_id, 42);
        assert_eq!(back.command_type(), "follow");
    }
}
