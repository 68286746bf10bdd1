//! SearchJob - poll the search API for posts matching an account's query.

use serde::{Deserialize, Serialize};

use crate::kernel::jobs::CommandMeta;
use crate::kernel::social::SearchCursor;

/// Search for posts and fan out follow work from the results.
///
/// At most one of `since_id` / `max_id` is set; the constructors enforce it.
/// `since_id` advances the forward watermark, `max_id` pages backward through
/// history, neither means a cursor-less poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchJob {
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_id: Option<u64>,
}

impl SearchJob {
    pub const JOB_TYPE: &'static str = "search";

    /// Cursor-less search: the seed job per account and the idle re-poll.
    pub fn initial(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            since_id: None,
            max_id: None,
        }
    }

    /// Continue forward from the newest already-seen post.
    pub fn newer_than(account_id: impl Into<String>, since_id: u64) -> Self {
        Self {
            account_id: account_id.into(),
            since_id: Some(since_id),
            max_id: None,
        }
    }

    /// Page backward through older history.
    pub fn older_than(account_id: impl Into<String>, max_id: u64) -> Self {
        Self {
            account_id: account_id.into(),
            since_id: None,
            max_id: Some(max_id),
        }
    }

    /// The paging position this job asks the service for.
    pub fn cursor(&self) -> SearchCursor {
        match (self.since_id, self.max_id) {
            (Some(id), _) => SearchCursor::NewerThan(id),
            (None, Some(id)) => SearchCursor::OlderThan(id),
            (None, None) => SearchCursor::Unpaged,
        }
    }
}

impl CommandMeta for SearchJob {
    fn command_type(&self) -> &'static str {
        Self::JOB_TYPE
    }
}
