// TestDependencies - scripted implementations for testing
//
// Provides a mock SocialApi with scripted responses and recorded calls, plus
// a helper that assembles WorkerDeps around the in-memory queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domains::follow::models::AccountRegistry;
use crate::kernel::deps::WorkerDeps;
use crate::kernel::jobs::MemoryJobQueue;
use crate::kernel::pacer::Pacer;
use crate::kernel::social::{
    ConnectionsPage, Credentials, FoundPost, SearchCursor, SearchPage, SocialApi, SocialError,
};

/// Arguments captured from a search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCallArgs {
    pub query: String,
    pub cursor: SearchCursor,
}

/// Mock social API client with scripted responses.
///
/// Responses are consumed FIFO; when a script runs dry the mock answers with
/// an empty page (or `Ok` for follows), so tests only script what they assert.
#[derive(Default)]
pub struct MockSocialApi {
    search_responses: Mutex<VecDeque<Result<SearchPage, String>>>,
    connections_responses: Mutex<VecDeque<Result<ConnectionsPage, String>>>,
    follow_responses: Mutex<VecDeque<Result<(), String>>>,
    search_calls: Mutex<Vec<SearchCallArgs>>,
    connections_calls: Mutex<Vec<Option<u64>>>,
    follow_calls: Mutex<Vec<u64>>,
}

impl MockSocialApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a search page; `posts` are `(post_id, author_id)` newest first.
    pub fn with_search_page(self, posts: &[(u64, u64)], older_cursor: Option<u64>) -> Self {
        let page = SearchPage {
            posts: posts
                .iter()
                .map(|&(id, author_id)| FoundPost { id, author_id })
                .collect(),
            older_cursor,
        };
        self.search_responses.lock().unwrap().push_back(Ok(page));
        self
    }

    pub fn with_search_error(self, message: &str) -> Self {
        self.search_responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn with_connections_page(self, ids: &[u64], next_cursor: Option<u64>) -> Self {
        let page = ConnectionsPage {
            ids: ids.to_vec(),
            next_cursor,
        };
        self.connections_responses
            .lock()
            .unwrap()
            .push_back(Ok(page));
        self
    }

    pub fn with_connections_error(self, message: &str) -> Self {
        self.connections_responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn with_follow_error(self, message: &str) -> Self {
        self.follow_responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn search_calls(&self) -> Vec<SearchCallArgs> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn connections_calls(&self) -> Vec<Option<u64>> {
        self.connections_calls.lock().unwrap().clone()
    }

    pub fn follow_calls(&self) -> Vec<u64> {
        self.follow_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocialApi for MockSocialApi {
    async fn search(
        &self,
        _creds: &Credentials,
        query: &str,
        cursor: SearchCursor,
    ) -> Result<SearchPage, SocialError> {
        self.search_calls.lock().unwrap().push(SearchCallArgs {
            query: query.to_string(),
            cursor,
        });
        match self.search_responses.lock().unwrap().pop_front() {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(SocialError::Api { message }),
            None => Ok(SearchPage::default()),
        }
    }

    async fn list_connections(
        &self,
        _creds: &Credentials,
        _account_id: &str,
        cursor: Option<u64>,
    ) -> Result<ConnectionsPage, SocialError> {
        self.connections_calls.lock().unwrap().push(cursor);
        match self.connections_responses.lock().unwrap().pop_front() {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(SocialError::Api { message }),
            None => Ok(ConnectionsPage::default()),
        }
    }

    async fn follow(&self, _creds: &Credentials, target_id: u64) -> Result<(), SocialError> {
        self.follow_calls.lock().unwrap().push(target_id);
        match self.follow_responses.lock().unwrap().pop_front() {
            Some(Ok(())) => Ok(()),
            Some(Err(message)) => Err(SocialError::Api { message }),
            None => Ok(()),
        }
    }
}

/// Assemble WorkerDeps around the in-memory queue and a mock API.
///
/// Returns the queue separately so tests can inspect enqueued jobs.
pub fn test_deps(
    api: Arc<MockSocialApi>,
    accounts: AccountRegistry,
) -> (Arc<WorkerDeps>, Arc<MemoryJobQueue>) {
    let queue = Arc::new(MemoryJobQueue::new());
    let deps = Arc::new(WorkerDeps::new(
        queue.clone(),
        api,
        Arc::new(accounts),
        Pacer::default(),
    ));
    (deps, queue)
}
