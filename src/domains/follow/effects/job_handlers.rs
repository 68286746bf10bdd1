//! Job handlers for the follow domain.
//!
//! Each handler performs one remote call and derives the follow-on jobs from
//! the outcome; a failure returns `Err` without chaining anything, and the
//! queue's retry budget takes over. Every handler runs the same preamble:
//! resolve the account, wait for its pacing slot, stamp the execution time.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use tracing::info;

use crate::domains::follow::jobs::{FollowJob, ListConnectionsJob, SearchJob};
use crate::domains::follow::models::Account;
use crate::kernel::deps::WorkerDeps;
use crate::kernel::jobs::{JobQueueExt, JobRegistry};

/// Resolve the account, honor its pacing slot, then stamp the execution
/// time. The stamp lands before the remote call so a slow or failing call
/// still claims the slot.
async fn begin(account_id: &str, deps: &WorkerDeps) -> Result<Arc<Account>> {
    let account = deps
        .accounts
        .get(account_id)
        .ok_or_else(|| anyhow!("unknown account: {account_id}"))?;

    deps.pacer
        .wait_turn(account.last_job_time(), &deps.shutdown)
        .await?;
    account.stamp_job_time(Utc::now());

    Ok(account)
}

/// Execute one search page and fan out the resulting work.
pub async fn handle_search(job: SearchJob, deps: Arc<WorkerDeps>) -> Result<()> {
    let account = begin(&job.account_id, &deps).await?;

    let page = deps
        .social
        .search(account.credentials(), account.search_query(), job.cursor())
        .await?;

    // One follow per author never targeted before; exclusions never pass.
    let mut follows = 0usize;
    for post in &page.posts {
        if account.record_target(post.author_id) {
            deps.jobs
                .enqueue(FollowJob::new(&job.account_id, post.author_id))
                .await?;
            follows += 1;
        }
    }

    // Every search cycle refreshes the account's connection list.
    deps.jobs
        .enqueue(ListConnectionsJob::fresh(&job.account_id))
        .await?;

    // Keep paging backward while the service reports older history.
    if !page.posts.is_empty() {
        if let Some(older) = page.older_cursor {
            deps.jobs
                .enqueue(SearchJob::older_than(&job.account_id, older))
                .await?;
        }
    }

    // Exactly one successor continues the cycle: an idle re-poll when the
    // page was empty, otherwise the advanced forward watermark.
    match page.newest_id() {
        None => {
            deps.jobs
                .enqueue(SearchJob::initial(&job.account_id))
                .await?;
        }
        Some(newest) => {
            deps.jobs
                .enqueue(SearchJob::newer_than(&job.account_id, newest))
                .await?;
        }
    }

    info!(
        account_id = %job.account_id,
        results = page.posts.len(),
        follows,
        older_cursor = ?page.older_cursor,
        "search cycle complete"
    );
    Ok(())
}

/// Merge one page of existing connections; chain the next page if reported.
pub async fn handle_list_connections(job: ListConnectionsJob, deps: Arc<WorkerDeps>) -> Result<()> {
    let account = begin(&job.account_id, &deps).await?;

    let page = deps
        .social
        .list_connections(account.credentials(), &job.account_id, job.cursor)
        .await?;

    let merged = page.ids.len();
    account.absorb_connections(page.ids);

    if let Some(next) = page.next_cursor {
        deps.jobs
            .enqueue(ListConnectionsJob::with_cursor(&job.account_id, next))
            .await?;
    }

    info!(
        account_id = %job.account_id,
        merged,
        next_cursor = ?page.next_cursor,
        "connection page merged"
    );
    Ok(())
}

/// Establish one connection. Terminal: no follow-on jobs.
pub async fn handle_follow(job: FollowJob, deps: Arc<WorkerDeps>) -> Result<()> {
    let account = begin(&job.account_id, &deps).await?;

    deps.social
        .follow(account.credentials(), job.target_id)
        .await?;

    info!(account_id = %job.account_id, target_id = job.target_id, "follow issued");
    Ok(())
}

/// Register all follow-domain job types with the runner's registry.
pub fn register_follow_jobs(registry: &mut JobRegistry) {
    registry.register::<SearchJob, _, _>(SearchJob::JOB_TYPE, |job, deps| async move {
        handle_search(job, deps).await
    });
    registry.register::<ListConnectionsJob, _, _>(
        ListConnectionsJob::JOB_TYPE,
        |job, deps| async move { handle_list_connections(job, deps).await },
    );
    registry.register::<FollowJob, _, _>(FollowJob::JOB_TYPE, |job, deps| async move {
        handle_follow(job, deps).await
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde::de::DeserializeOwned;

    use crate::domains::follow::models::AccountRegistry;
    use crate::kernel::jobs::MemoryJobQueue;
    use crate::kernel::social::{Credentials, SearchCursor};
    use crate::kernel::test_dependencies::{test_deps, MockSocialApi};

    fn single_account(exclusions: &[u64]) -> AccountRegistry {
        let mut registry = AccountRegistry::new();
        registry.insert(Account::new(
            "acct-1",
            Credentials::new("token"),
            "#rustlang",
            exclusions.iter().copied().collect(),
        ));
        registry
    }

    fn pending<C: DeserializeOwned>(queue: &MemoryJobQueue, job_type: &str) -> Vec<C> {
        queue
            .pending_of_type(job_type)
            .into_iter()
            .map(|job| serde_json::from_value(job.args.unwrap()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn search_follows_new_authors_and_skips_exclusions() {
        // Authors {3, 7, 9} with 7 excluded: follows go out for 9 and 3 only.
        let api = Arc::new(
            MockSocialApi::new().with_search_page(&[(109, 9), (107, 7), (103, 3)], None),
        );
        let (deps, queue) = test_deps(api.clone(), single_account(&[7]));

        handle_search(SearchJob::initial("acct-1"), deps.clone()).await.unwrap();

        let follows: Vec<FollowJob> = pending(&queue, FollowJob::JOB_TYPE);
        let mut targets: Vec<u64> = follows.iter().map(|f| f.target_id).collect();
        targets.sort_unstable();
        assert_eq!(targets, vec![3, 9]);

        let account = deps.accounts.get("acct-1").unwrap();
        assert!(account.is_following(9));
        assert!(account.is_following(3));
        assert!(!account.is_following(7));

        // One connection refresh, one forward-watermark search, no backfill.
        let listings: Vec<ListConnectionsJob> = pending(&queue, ListConnectionsJob::JOB_TYPE);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].cursor, None);

        let searches: Vec<SearchJob> = pending(&queue, SearchJob::JOB_TYPE);
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].since_id, Some(109));
        assert_eq!(searches[0].max_id, None);

        assert_eq!(
            api.search_calls(),
            vec![crate::kernel::test_dependencies::SearchCallArgs {
                query: "#rustlang".to_string(),
                cursor: SearchCursor::Unpaged,
            }]
        );
    }

    #[tokio::test]
    async fn empty_search_page_reissues_an_unpaged_poll() {
        let api = Arc::new(MockSocialApi::new().with_search_page(&[], Some(50)));
        let (deps, queue) = test_deps(api, single_account(&[]));

        handle_search(SearchJob::newer_than("acct-1", 900), deps).await.unwrap();

        // Empty page: no follows, no backfill even though a cursor came back.
        assert!(pending::<FollowJob>(&queue, FollowJob::JOB_TYPE).is_empty());

        let searches: Vec<SearchJob> = pending(&queue, SearchJob::JOB_TYPE);
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].since_id, None);
        assert_eq!(searches[0].max_id, None);

        assert_eq!(
            pending::<ListConnectionsJob>(&queue, ListConnectionsJob::JOB_TYPE).len(),
            1
        );
    }

    #[tokio::test]
    async fn non_empty_page_with_older_cursor_chains_a_backfill() {
        let api = Arc::new(
            MockSocialApi::new().with_search_page(&[(200, 11), (150, 12)], Some(149)),
        );
        let (deps, queue) = test_deps(api, single_account(&[]));

        handle_search(SearchJob::initial("acct-1"), deps).await.unwrap();

        let searches: Vec<SearchJob> = pending(&queue, SearchJob::JOB_TYPE);
        assert_eq!(searches.len(), 2);

        let backfill = searches.iter().find(|s| s.max_id.is_some()).unwrap();
        assert_eq!(backfill.max_id, Some(149));
        assert_eq!(backfill.since_id, None);

        let watermark = searches.iter().find(|s| s.since_id.is_some()).unwrap();
        assert_eq!(watermark.since_id, Some(200));
    }

    #[tokio::test]
    async fn failed_search_chains_nothing() {
        let api = Arc::new(MockSocialApi::new().with_search_error("over capacity"));
        let (deps, queue) = test_deps(api, single_account(&[]));

        let err = handle_search(SearchJob::initial("acct-1"), deps.clone())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("over capacity"));
        assert_eq!(queue.pending_len(), 0);

        // The pacing stamp still landed; the slot was claimed before the call.
        let account = deps.accounts.get("acct-1").unwrap();
        assert!(account.last_job_time() > chrono::DateTime::<Utc>::UNIX_EPOCH);
    }

    #[tokio::test(start_paused = true)]
    async fn redelivered_search_success_never_duplicates_follows() {
        // The same page delivered twice: follow-on Search/ListConnections jobs
        // duplicate, follow emissions do not.
        let api = Arc::new(
            MockSocialApi::new()
                .with_search_page(&[(109, 9), (103, 3)], None)
                .with_search_page(&[(109, 9), (103, 3)], None),
        );
        let (deps, queue) = test_deps(api, single_account(&[]));

        handle_search(SearchJob::initial("acct-1"), deps.clone()).await.unwrap();
        handle_search(SearchJob::initial("acct-1"), deps.clone()).await.unwrap();

        let follows: Vec<FollowJob> = pending(&queue, FollowJob::JOB_TYPE);
        assert_eq!(follows.len(), 2);

        assert_eq!(pending::<SearchJob>(&queue, SearchJob::JOB_TYPE).len(), 2);
        assert_eq!(
            pending::<ListConnectionsJob>(&queue, ListConnectionsJob::JOB_TYPE).len(),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connection_listing_follows_cursors_to_the_end() {
        let api = Arc::new(
            MockSocialApi::new()
                .with_connections_page(&[1, 2], Some(777))
                .with_connections_page(&[3], None),
        );
        let (deps, queue) = test_deps(api.clone(), single_account(&[]));

        handle_list_connections(ListConnectionsJob::fresh("acct-1"), deps.clone())
            .await
            .unwrap();

        let chained: Vec<ListConnectionsJob> = pending(&queue, ListConnectionsJob::JOB_TYPE);
        assert_eq!(chained.len(), 1);
        assert_eq!(chained[0].cursor, Some(777));

        handle_list_connections(chained[0].clone(), deps.clone()).await.unwrap();

        // Chain ends: the second page reported no next cursor.
        assert_eq!(
            pending::<ListConnectionsJob>(&queue, ListConnectionsJob::JOB_TYPE).len(),
            1
        );
        assert_eq!(api.connections_calls(), vec![None, Some(777)]);

        let account = deps.accounts.get("acct-1").unwrap();
        assert_eq!(account.connection_count(), 3);
        assert!(account.is_following(2));
    }

    #[tokio::test]
    async fn absorbed_connections_suppress_follow_emission() {
        let api = Arc::new(MockSocialApi::new().with_connections_page(&[9], None));
        let (deps, queue) = test_deps(api.clone(), single_account(&[]));

        handle_list_connections(ListConnectionsJob::fresh("acct-1"), deps.clone())
            .await
            .unwrap();

        // A later search discovering author 9 must not follow again.
        let account = deps.accounts.get("acct-1").unwrap();
        assert!(!account.record_target(9));
        assert!(pending::<FollowJob>(&queue, FollowJob::JOB_TYPE).is_empty());
    }

    #[tokio::test]
    async fn follow_issues_the_remote_call_and_ends() {
        let api = Arc::new(MockSocialApi::new());
        let (deps, queue) = test_deps(api.clone(), single_account(&[]));

        handle_follow(FollowJob::new("acct-1", 42), deps).await.unwrap();

        assert_eq!(api.follow_calls(), vec![42]);
        assert_eq!(queue.pending_len(), 0);
    }

    #[tokio::test]
    async fn failed_follow_propagates_for_retry() {
        let api = Arc::new(MockSocialApi::new().with_follow_error("duplicate request"));
        let (deps, _queue) = test_deps(api, single_account(&[]));

        let err = handle_follow(FollowJob::new("acct-1", 42), deps)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate request"));
    }

    #[tokio::test]
    async fn unknown_account_is_a_permanent_failure() {
        let api = Arc::new(MockSocialApi::new());
        let (deps, _queue) = test_deps(api, AccountRegistry::new());

        let err = handle_search(SearchJob::initial("ghost"), deps)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown account"));
    }

    #[test]
    fn all_job_types_are_registered() {
        let mut registry = JobRegistry::new();
        register_follow_jobs(&mut registry);

        assert!(registry.is_registered(SearchJob::JOB_TYPE));
        assert!(registry.is_registered(ListConnectionsJob::JOB_TYPE));
        assert!(registry.is_registered(FollowJob::JOB_TYPE));
    }
}
