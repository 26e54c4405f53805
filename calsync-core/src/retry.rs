//! Retry with exponential backoff for quota-exceeded failures.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{CalSyncError, CalSyncResult};
use crate::quota::QuotaTracker;
use crate::remote::RemoteError;

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `k` (1-based): `min(base * 2^(k-1), max_delay)`.
    pub fn delay_for(&self, k: u32) -> Duration {
        let factor = 2u32.checked_pow(k.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Runs remote calls, retrying only on quota exhaustion.
///
/// Every attempt is counted against the shared [`QuotaTracker`].
#[derive(Debug, Clone)]
pub struct Executor {
    policy: RetryPolicy,
    quota: Arc<QuotaTracker>,
    cancel: CancellationToken,
}

impl Executor {
    pub fn new(policy: RetryPolicy, quota: Arc<QuotaTracker>, cancel: CancellationToken) -> Self {
        Executor {
            policy,
            quota,
            cancel,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent on quota errors.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> CalSyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        for attempt in 1..=self.policy.max_attempts {
            if self.cancel.is_cancelled() {
                return Err(CalSyncError::Cancelled);
            }

            self.quota.record(1);
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation = label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_quota_exceeded() => {
                    if attempt == self.policy.max_attempts {
                        tracing::error!(operation = label, attempt, error = %err, "Retries exhausted");
                        break;
                    }
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        operation = label,
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "Quota exceeded, backing off"
                    );
                    self.sleep(delay).await?;
                }
                Err(err) => {
                    tracing::debug!(operation = label, error = %err, "Permanent remote error");
                    return Err(err.into());
                }
            }
        }

        Err(CalSyncError::SyncExhausted {
            label: label.to_string(),
            attempts: self.policy.max_attempts,
        })
    }

    /// Sleep unless cancelled first.
    pub async fn sleep(&self, duration: Duration) -> CalSyncResult<()> {
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(CalSyncError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
