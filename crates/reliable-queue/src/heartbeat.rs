//! Consumer liveness heartbeat.
//!
//! A background task rewrites an expiring marker key at a fixed interval.
//! Whether a consumer is alive is nothing more than whether its marker
//! currently exists: when the owning process dies the task dies with it and
//! the marker lapses after at most one TTL.

use crate::config::HeartbeatConfig;
use crate::error::{QueueError, StoreError};
use crate::store::KeyValueStore;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;

const MARKER_VALUE: &str = "ping";

/// Handle to a running heartbeat task. Dropping it stops the task.
#[derive(Debug)]
pub struct Heartbeat {
    key: String,
    task: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawn the heartbeat task and wait until its first marker write landed.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the interval is not shorter than the
    /// TTL, or the store error if the first write fails. Later write failures
    /// are logged and tolerated.
    pub async fn start(
        store: Arc<dyn KeyValueStore>,
        key: String,
        config: HeartbeatConfig,
    ) -> Result<Self, QueueError> {
        // A zero interval would panic inside the ticker.
        config.validate()?;

        let (first_write_tx, first_write_rx) = oneshot::channel();
        let task = tokio::spawn(run(store, key.clone(), config, first_write_tx));

        // Owning the handle before waiting means a cancelled start aborts the task.
        let heartbeat = Self { key, task };

        match first_write_rx.await {
            Ok(Ok(())) => {
                debug!(key = %heartbeat.key, "Heartbeat started");
                Ok(heartbeat)
            }
            Ok(Err(error)) => Err(QueueError::Store(error)),
            Err(_) => Err(QueueError::Store(StoreError::Internal {
                message: "heartbeat task exited before its first write".to_string(),
            })),
        }
    }

    /// Key of the liveness marker
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    store: Arc<dyn KeyValueStore>,
    key: String,
    config: HeartbeatConfig,
    first_write: oneshot::Sender<Result<(), StoreError>>,
) {
    let ttl = config.ttl();
    let mut ticker = tokio::time::interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately.
    ticker.tick().await;
    let result = store.set_with_ttl(&key, MARKER_VALUE, ttl).await;
    let started = result.is_ok();
    let _ = first_write.send(result);
    if !started {
        return;
    }

    loop {
        ticker.tick().await;
        match store.set_with_ttl(&key, MARKER_VALUE, ttl).await {
            Ok(()) => trace!(key = %key, "Heartbeat written"),
            Err(error) => warn!(key = %key, error = %error, "Heartbeat write failed"),
        }
    }
}
