//! Remote social API client.
//!
//! [`SocialApi`] is the contract the job handlers are written against;
//! [`HttpSocialApi`] is the reqwest-backed implementation. Credentials are
//! opaque to everything outside this module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Posts requested per search page.
pub const SEARCH_PAGE_SIZE: u32 = 100;
/// Connection ids requested per listing page.
pub const CONNECTIONS_PAGE_SIZE: u32 = 5000;

/// Opaque API credentials, passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials(String);

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    fn bearer(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api error: {message}")]
    Api { message: String },
    #[error("unexpected status {0}")]
    Status(u16),
}

/// Paging position for a search request. At most one bound applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchCursor {
    #[default]
    Unpaged,
    /// Only posts newer than this id (forward watermark).
    NewerThan(u64),
    /// Only posts older than this id (history backfill).
    OlderThan(u64),
}

/// One post returned by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundPost {
    pub id: u64,
    pub author_id: u64,
}

/// One page of search results, newest post first.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub posts: Vec<FoundPost>,
    /// Cursor for the next older page, if the service reported one.
    pub older_cursor: Option<u64>,
}

impl SearchPage {
    /// Id of the newest post on the page; the forward watermark advances here.
    pub fn newest_id(&self) -> Option<u64> {
        self.posts.first().map(|p| p.id)
    }
}

/// One page of an account's existing connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionsPage {
    pub ids: Vec<u64>,
    pub next_cursor: Option<u64>,
}

/// Client contract for the remote social service.
#[async_trait]
pub trait SocialApi: Send + Sync {
    /// Search posts matching `query` at the given paging position.
    async fn search(
        &self,
        creds: &Credentials,
        query: &str,
        cursor: SearchCursor,
    ) -> Result<SearchPage, SocialError>;

    /// List ids the account is already connected to.
    async fn list_connections(
        &self,
        creds: &Credentials,
        account_id: &str,
        cursor: Option<u64>,
    ) -> Result<ConnectionsPage, SocialError>;

    /// Establish a connection to `target_id`.
    async fn follow(&self, creds: &Credentials, target_id: u64) -> Result<(), SocialError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// The service reports "no cursor" as a literal zero.
fn cursor_from_wire(raw: u64) -> Option<u64> {
    (raw > 0).then_some(raw)
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    results: Vec<FoundPost>,
    #[serde(default)]
    older_cursor: u64,
    #[serde(default)]
    errors: Vec<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ConnectionsBody {
    #[serde(default)]
    ids: Vec<u64>,
    #[serde(default)]
    next_cursor: u64,
    #[serde(default)]
    errors: Vec<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct FollowBody {
    #[serde(default)]
    errors: Vec<ApiErrorBody>,
}

/// reqwest-backed [`SocialApi`] using bearer auth against a base URL.
pub struct HttpSocialApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSocialApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A 2xx body can still carry a structured `errors` array.
    fn check_errors(errors: &[ApiErrorBody]) -> Result<(), SocialError> {
        match errors.first() {
            Some(first) => Err(SocialError::Api {
                message: first.message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn check_status(status: reqwest::StatusCode) -> Result<(), SocialError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(SocialError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl SocialApi for HttpSocialApi {
    async fn search(
        &self,
        creds: &Credentials,
        query: &str,
        cursor: SearchCursor,
    ) -> Result<SearchPage, SocialError> {
        let mut params = vec![
            ("q", query.to_string()),
            ("count", SEARCH_PAGE_SIZE.to_string()),
        ];
        match cursor {
            SearchCursor::Unpaged => {}
            SearchCursor::NewerThan(id) => params.push(("since_id", id.to_string())),
            SearchCursor::OlderThan(id) => params.push(("max_id", id.to_string())),
        }

        let response = self
            .client
            .get(self.endpoint("/search"))
            .bearer_auth(creds.bearer())
            .query(&params)
            .send()
            .await?;
        Self::check_status(response.status())?;

        let body: SearchBody = response.json().await?;
        Self::check_errors(&body.errors)?;

        Ok(SearchPage {
            posts: body.results,
            older_cursor: cursor_from_wire(body.older_cursor),
        })
    }

    async fn list_connections(
        &self,
        creds: &Credentials,
        account_id: &str,
        cursor: Option<u64>,
    ) -> Result<ConnectionsPage, SocialError> {
        let mut params = vec![
            ("user_id", account_id.to_string()),
            ("count", CONNECTIONS_PAGE_SIZE.to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }

        let response = self
            .client
            .get(self.endpoint("/connections"))
            .bearer_auth(creds.bearer())
            .query(&params)
            .send()
            .await?;
        Self::check_status(response.status())?;

        let body: ConnectionsBody = response.json().await?;
        Self::check_errors(&body.errors)?;

        Ok(ConnectionsPage {
            ids: body.ids,
            next_cursor: cursor_from_wire(body.next_cursor),
        })
    }

    async fn follow(&self, creds: &Credentials, target_id: u64) -> Result<(), SocialError> {
        let response = self
            .client
            .post(self.endpoint("/follow"))
            .bearer_auth(creds.bearer())
            .json(&serde_json::json!({ "target_id": target_id }))
            .send()
            .await?;
        Self::check_status(response.status())?;

        let body: FollowBody = response.json().await?;
        Self::check_errors(&body.errors)?;
        Ok(())
    }
}
