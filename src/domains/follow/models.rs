//! Account state for the follow domain.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::config::AccountConfig;
use crate::kernel::social::Credentials;

/// Mutable per-account crawl state, serialized behind the account's lock.
#[derive(Debug)]
struct AccountState {
    /// When this account last started executing a job; epoch before any run.
    last_job_time: DateTime<Utc>,
    /// Ids this account already follows or has been told to follow.
    connections: HashSet<u64>,
}

/// One configured account: immutable identity plus locked crawl state.
pub struct Account {
    id: String,
    credentials: Credentials,
    search_query: String,
    /// Ids this account must never follow. Read-only after load.
    exclusions: HashSet<u64>,
    state: Mutex<AccountState>,
}

impl Account {
    pub fn new(
        id: impl Into<String>,
        credentials: Credentials,
        search_query: impl Into<String>,
        exclusions: HashSet<u64>,
    ) -> Self {
        Self {
            id: id.into(),
            credentials,
            search_query: search_query.into(),
            exclusions,
            state: Mutex::new(AccountState {
                last_job_time: DateTime::<Utc>::UNIX_EPOCH,
                connections: HashSet::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    fn lock_state(&self) -> MutexGuard<'_, AccountState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn last_job_time(&self) -> DateTime<Utc> {
        self.lock_state().last_job_time
    }

    /// Stamp the start of a job execution. The stamp lands before the remote
    /// call so a slow or failing job still claims its pacing slot.
    pub fn stamp_job_time(&self, now: DateTime<Utc>) {
        self.lock_state().last_job_time = now;
    }

    /// Record a newly discovered follow target.
    ///
    /// Returns `false` when the id is excluded or already recorded; callers
    /// emit a follow job only on `true`. The excluded-and-new check happens
    /// under one lock acquisition, so a redelivered job can never slip a
    /// duplicate through.
    pub fn record_target(&self, id: u64) -> bool {
        if self.exclusions.contains(&id) {
            return false;
        }
        self.lock_state().connections.insert(id)
    }

    /// Merge already-established connections reported by the service.
    ///
    /// Exclusions are not applied here: these are existing relationships,
    /// not new follow targets. An excluded id that arrives this way still
    /// blocks future follow emissions for it.
    pub fn absorb_connections(&self, ids: impl IntoIterator<Item = u64>) {
        self.lock_state().connections.extend(ids);
    }

    pub fn is_following(&self, id: u64) -> bool {
        self.lock_state().connections.contains(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.lock_state().connections.len()
    }

    pub fn is_excluded(&self, id: u64) -> bool {
        self.exclusions.contains(&id)
    }
}

/// All configured accounts, keyed by id.
#[derive(Default)]
pub struct AccountRegistry {
    accounts: HashMap<String, Arc<Account>>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from parsed accounts-file entries.
    pub fn from_configs(configs: &[AccountConfig]) -> Self {
        let accounts = configs
            .iter()
            .map(|c| {
                let account = Account::new(
                    c.id.clone(),
                    Credentials::new(c.token.clone()),
                    c.search.clone(),
                    c.exclude.iter().copied().collect(),
                );
                (c.id.clone(), Arc::new(account))
            })
            .collect();
        Self { accounts }
    }

    pub fn insert(&mut self, account: Account) {
        self.accounts
            .insert(account.id().to_string(), Arc::new(account));
    }

    pub fn get(&self, id: &str) -> Option<Arc<Account>> {
        self.accounts.get(id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Account>> {
        self.accounts.values()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_with_exclusions(exclusions: &[u64]) -> Account {
        Account::new(
            "acct-1",
            Credentials::new("token"),
            "#rustlang",
            exclusions.iter().copied().collect(),
        )
    }

    #[test]
    fn record_target_rejects_excluded_ids() {
        let account = account_with_exclusions(&[7]);
        assert!(!account.record_target(7));
        assert!(!account.is_following(7));
        assert!(account.is_excluded(7));
    }

    #[test]
    fn record_target_accepts_each_id_once() {
        let account = account_with_exclusions(&[]);
        assert!(account.record_target(42));
        assert!(!account.record_target(42));
        assert!(account.is_following(42));
        assert_eq!(account.connection_count(), 1);
    }

    #[test]
    fn absorbed_connections_block_future_targets() {
        let account = account_with_exclusions(&[]);
        account.absorb_connections([5, 6]);
        assert!(!account.record_target(5));
        assert!(account.record_target(9));
        assert_eq!(account.connection_count(), 3);
    }

    #[test]
    fn absorb_keeps_excluded_existing_relationships() {
        // An excluded id that is already a connection is kept as state; it
        // just can never become a follow target.
        let account = account_with_exclusions(&[7]);
        account.absorb_connections([7]);
        assert!(account.is_following(7));
        assert!(!account.record_target(7));
    }

    #[test]
    fn last_job_time_starts_at_epoch_and_advances() {
        let account = account_with_exclusions(&[]);
        assert_eq!(account.last_job_time(), DateTime::<Utc>::UNIX_EPOCH);

        let now = Utc::now();
        account.stamp_job_time(now);
        assert_eq!(account.last_job_time(), now);
    }

    #[test]
    fn registry_builds_from_configs() {
        let configs = vec![
            AccountConfig {
                id: "alice".to_string(),
                token: "tok-a".to_string(),
                search: "#rustlang".to_string(),
                exclude: vec![7],
            },
            AccountConfig {
                id: "bob".to_string(),
                token: "tok-b".to_string(),
                search: "tokio".to_string(),
                exclude: vec![],
            },
        ];

        let registry = AccountRegistry::from_configs(&configs);
        assert_eq!(registry.len(), 2);

        let alice = registry.get("alice").unwrap();
        assert_eq!(alice.search_query(), "#rustlang");
        assert!(alice.is_excluded(7));
        assert!(registry.get("ghost").is_none());
    }
}
