use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote social API.
    pub api_base_url: String,
    /// Path to the JSON accounts file (see [`AccountConfig`]).
    pub accounts_file: String,
    /// Minimum spacing between two job executions for one account.
    pub base_delay: Duration,
    /// How long the worker sleeps when the queue is empty.
    pub poll_interval: Duration,
    /// How long shutdown waits for the in-flight job to drain.
    pub shutdown_grace: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            api_base_url: env::var("FOLLOWBOT_API_BASE_URL")
                .context("FOLLOWBOT_API_BASE_URL must be set")?,
            accounts_file: env::var("FOLLOWBOT_ACCOUNTS_FILE")
                .context("FOLLOWBOT_ACCOUNTS_FILE must be set")?,
            base_delay: env_duration_ms("FOLLOWBOT_BASE_DELAY_MS", 60_000)?,
            poll_interval: env_duration_ms("FOLLOWBOT_POLL_INTERVAL_MS", 1_000)?,
            shutdown_grace: env_duration_ms("FOLLOWBOT_SHUTDOWN_GRACE_MS", 5_000)?,
        })
    }
}

fn env_duration_ms(key: &str, default_ms: u64) -> Result<Duration> {
    match env::var(key) {
        Ok(raw) => {
            let ms: u64 = raw
                .parse()
                .with_context(|| format!("{key} must be a number of milliseconds"))?;
            Ok(Duration::from_millis(ms))
        }
        Err(_) => Ok(Duration::from_millis(default_ms)),
    }
}

/// One configured account as it appears in the accounts file.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Externally assigned account identifier.
    pub id: String,
    /// Opaque API token; passed through to the client untouched.
    pub token: String,
    /// Search query this account crawls.
    pub search: String,
    /// Entity ids this account must never follow.
    #[serde(default)]
    pub exclude: Vec<u64>,
}

/// Parse the accounts file contents.
pub fn parse_accounts(raw: &str) -> Result<Vec<AccountConfig>> {
    let accounts: Vec<AccountConfig> =
        serde_json::from_str(raw).context("accounts file is not valid JSON")?;
    Ok(accounts)
}

/// Load and parse the accounts file.
pub fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<AccountConfig>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read accounts file '{}'", path.display()))?;
    parse_accounts(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accounts_reads_all_fields() {
        let raw = r##"[
            {"id": "alice", "token": "tok-a", "search": "#rustlang", "exclude": [7, 9]},
            {"id": "bob", "token": "tok-b", "search": "tokio"}
        ]"##;

        let accounts = parse_accounts(raw).unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].id, "alice");
        assert_eq!(accounts[0].exclude, vec![7, 9]);
        assert_eq!(accounts[1].search, "tokio");
    }

    #[test]
    fn exclude_defaults_to_empty() {
        let raw = r#"[{"id": "a", "token": "t", "search": "q"}]"#;
        let accounts = parse_accounts(raw).unwrap();
        assert!(accounts[0].exclude.is_empty());
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(parse_accounts("not json").is_err());
    }
}
