//! ListConnectionsJob - enumerate an account's existing connections.

use serde::{Deserialize, Serialize};

use crate::kernel::jobs::CommandMeta;

/// Fetch one page of the account's connection ids and merge them into its
/// known set. A reported next cursor chains the following page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConnectionsJob {
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<u64>,
}

impl ListConnectionsJob {
    pub const JOB_TYPE: &'static str = "list_connections";

    /// Start a fresh enumeration from the first page.
    pub fn fresh(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            cursor: None,
        }
    }

    /// Continue a paged enumeration.
    pub fn with_cursor(account_id: impl Into<String>, cursor: u64) -> Self {
        Self {
            account_id: account_id.into(),
            cursor: Some(cursor),
        }
    }
}

impl CommandMeta for ListConnectionsJob {
    fn command_type(&self) -> &'static str {
        Self::JOB_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_has_no_cursor() {
        let job = ListConnectionsJob::fresh("a");
        assert_eq!(job.cursor, None);
        assert_eq!(job.command_type(), "list_connections");
    }

    #[test]
    fn payload_round_trips_through_json() {
        let job = ListConnectionsJob::with_cursor("bob", 5000);
        let value = serde_json::to_value(&job).unwrap();
        let back: ListConnectionsJob = serde_json::from_value(value).unwrap();

        assert_eq!(back.account_id, "bob");
        assert_eq!(back.cursor, Some(5000));
    }
}
