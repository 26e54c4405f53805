//! Advisory count of API calls made during a run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counts calls against an optional budget.
///
/// The tracker never blocks or denies a call; denial only comes back from
/// the remote service as a quota error.
#[derive(Debug, Default)]
pub struct QuotaTracker {
    total: Option<u64>,
    used: AtomicU64,
}

impl QuotaTracker {
    pub fn new(total: Option<u64>) -> Self {
        QuotaTracker {
            total,
            used: AtomicU64::new(0),
        }
    }

    pub fn unlimited() -> Self {
        QuotaTracker::new(None)
    }

    pub fn record(&self, n: u64) {
        self.used.fetch_add(n, Ordering::Relaxed);
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// `None` when there is no budget.
    pub fn remaining(&self) -> Option<u64> {
        self.total.map(|total| total.saturating_sub(self.used()))
    }

    pub fn is_over_budget(&self) -> bool {
        self.remaining() == Some(0)
    }
}
