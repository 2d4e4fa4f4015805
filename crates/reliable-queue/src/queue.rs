//! Named queues: the shared input and failed lists plus the consumer registry.

use crate::config::HeartbeatConfig;
use crate::consumer::Consumer;
use crate::error::QueueError;
use crate::keys::QueueKeys;
use crate::message::{ConsumerName, Message, MessageId, QueueName};
use crate::rate::RateCounter;
use crate::store::KeyValueStore;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

/// Handle to a named queue. Cheap to clone; clones address the same lists.
#[derive(Clone)]
pub struct Queue {
    keys: QueueKeys,
    store: Arc<dyn KeyValueStore>,
    heartbeat: HeartbeatConfig,
    input_rate: RateCounter,
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("name", self.keys.queue())
            .field("heartbeat", &self.heartbeat)
            .finish_non_exhaustive()
    }
}

impl Queue {
    /// Create a handle for `name` on the given store
    pub fn new(name: QueueName, store: Arc<dyn KeyValueStore>) -> Self {
        let keys = QueueKeys::new(name);
        let input_rate = RateCounter::new(Arc::clone(&store), keys.input_rate());
        Self {
            keys,
            store,
            heartbeat: HeartbeatConfig::default(),
            input_rate,
        }
    }

    /// Override the heartbeat timings used by consumers registered through
    /// this handle
    pub fn with_heartbeat(mut self, config: HeartbeatConfig) -> Self {
        self.heartbeat = config;
        self
    }

    pub fn name(&self) -> &QueueName {
        self.keys.queue()
    }

    pub fn keys(&self) -> &QueueKeys {
        &self.keys
    }

    pub fn heartbeat_config(&self) -> &HeartbeatConfig {
        &self.heartbeat
    }

    pub(crate) fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub(crate) fn input_rate(&self) -> &RateCounter {
        &self.input_rate
    }

    /// Append a message to the input list
    ///
    /// ```
    /// use bytes::Bytes;
    /// use reliable_queue::{InMemoryStore, Message, Queue, QueueName};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let queue = Queue::new(QueueName::new("jobs".to_string())?, Arc::new(InMemoryStore::new()));
    ///
    /// let message = Message::new(Bytes::from("resize image 42"));
    /// let id = queue.put(&message).await?;
    ///
    /// assert_eq!(id, message.id);
    /// assert_eq!(queue.input_length().await?, 1);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// # }).unwrap();
    /// ```
    pub async fn put(&self, message: &Message) -> Result<MessageId, QueueError> {
        let encoded = message.encode()?;
        self.store.append(&self.keys.input(), &encoded).await?;
        self.input_rate.record(1).await;

        debug!(queue = %self.name(), message_id = %message.id, "Message enqueued");
        Ok(message.id.clone())
    }

    /// Number of messages waiting for delivery
    pub async fn input_length(&self) -> Result<usize, QueueError> {
        Ok(self.store.length(&self.keys.input()).await?)
    }

    /// Number of messages parked in the failed list
    pub async fn failed_length(&self) -> Result<usize, QueueError> {
        Ok(self.store.length(&self.keys.failed()).await?)
    }

    /// Whether a consumer of this name currently holds a live heartbeat
    pub async fn is_active_consumer(&self, name: &ConsumerName) -> Result<bool, QueueError> {
        let keys = self.keys.consumer(name);
        Ok(self.store.key_exists(keys.heartbeat()).await?)
    }

    /// Register a consumer on this queue; see [`Consumer::register`]
    pub async fn add_consumer(&self, name: ConsumerName) -> Result<Consumer, QueueError> {
        Consumer::register(self, name).await
    }
}
