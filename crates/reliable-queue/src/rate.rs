//! Best-effort throughput counters.
//!
//! Counters are read by external monitoring only. A failed increment is
//! logged and dropped: by the time a counter is bumped the message has
//! already moved, and failing the call would misreport that move.

use crate::store::KeyValueStore;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

#[cfg(test)]
#[path = "rate_tests.rs"]
mod tests;

/// Monotonic counter stored under a single key
#[derive(Clone)]
pub struct RateCounter {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl fmt::Debug for RateCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateCounter")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl RateCounter {
    pub fn new(store: Arc<dyn KeyValueStore>, key: String) -> Self {
        Self { store, key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Add `amount` to the counter, swallowing store failures
    pub async fn record(&self, amount: u64) {
        if amount == 0 {
            return;
        }

        let amount = i64::try_from(amount).unwrap_or(i64::MAX);
        if let Err(error) = self.store.increment_counter(&self.key, amount).await {
            warn!(key = %self.key, amount, error = %error, "Failed to update rate counter");
        }
    }
}
