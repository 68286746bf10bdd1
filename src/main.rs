// Main entry point for the followbot worker

use std::sync::Arc;

use anyhow::{Context, Result};
use followbot::config::{load_accounts, Config};
use followbot::domains::follow::effects::register_follow_jobs;
use followbot::domains::follow::jobs::SearchJob;
use followbot::domains::follow::models::AccountRegistry;
use followbot::kernel::deps::WorkerDeps;
use followbot::kernel::jobs::{
    JobQueueExt, JobRegistry, JobRunner, JobRunnerConfig, MemoryJobQueue,
};
use followbot::kernel::pacer::Pacer;
use followbot::kernel::social::HttpSocialApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,followbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting followbot worker");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    let account_configs = load_accounts(&config.accounts_file)
        .with_context(|| format!("Failed to load accounts from {}", config.accounts_file))?;
    if account_configs.is_empty() {
        anyhow::bail!("no accounts configured in {}", config.accounts_file);
    }
    tracing::info!(accounts = account_configs.len(), "Configuration loaded");

    // Wire up dependencies
    let accounts = Arc::new(AccountRegistry::from_configs(&account_configs));
    let queue = Arc::new(MemoryJobQueue::new());
    let social = Arc::new(HttpSocialApi::new(config.api_base_url.clone()));
    let deps = Arc::new(WorkerDeps::new(
        queue.clone(),
        social,
        accounts.clone(),
        Pacer::new(config.base_delay),
    ));

    let mut registry = JobRegistry::new();
    register_follow_jobs(&mut registry);

    // One cursor-less search per account seeds every chain.
    for account in accounts.iter() {
        deps.jobs
            .enqueue(SearchJob::initial(account.id()))
            .await
            .context("Failed to enqueue seed job")?;
    }
    tracing::info!(accounts = accounts.len(), "Seed searches enqueued");

    let runner = JobRunner::with_config(
        queue,
        Arc::new(registry),
        deps,
        JobRunnerConfig {
            poll_interval: config.poll_interval,
            shutdown_grace: config.shutdown_grace,
            ..JobRunnerConfig::default()
        },
    );

    runner.run_until_shutdown().await
}
