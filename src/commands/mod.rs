pub mod audit;
pub mod auth;
pub mod dedupe;
pub mod delete;
pub mod list;
pub mod reset;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use calsync_core::config::SyncConfig;
use calsync_core::quota::QuotaTracker;
use calsync_core::retry::Executor;
use calsync_core::store::SyncStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Executor for one command run, cancelled by Ctrl-C.
pub fn executor(config: &SyncConfig, budget: Option<u64>) -> Executor {
    let cancel = CancellationToken::new();

    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, stopping after the current step...");
            tracing::warn!("Interrupted by user");
            token.cancel();
        }
    });

    Executor::new(
        config.retry_policy(),
        Arc::new(QuotaTracker::new(budget.or(config.quota_budget))),
        cancel,
    )
}

pub fn open_store(config: &SyncConfig) -> Result<SyncStore> {
    let path = config.store_path()?;
    SyncStore::open(&path).with_context(|| format!("Failed to open state store {}", path.display()))
}
