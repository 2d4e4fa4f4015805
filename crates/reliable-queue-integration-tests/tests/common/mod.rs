//! Common test utilities for reliable-queue integration tests
//!
//! This module provides:
//! - Queue fixtures over a shared in-memory store
//! - Fast heartbeat timings so liveness tests finish quickly
//! - Opt-in log output for debugging failures

use bytes::Bytes;
use reliable_queue::{
    Consumer, ConsumerName, HeartbeatConfig, InMemoryStore, KeyValueStore, Message, Queue,
    QueueName,
};
use std::sync::{Arc, Once};
use std::time::Duration;

static TRACING: Once = Once::new();

/// Heartbeat timings used by every fixture
pub const FAST_HEARTBEAT: HeartbeatConfig = HeartbeatConfig {
    interval_ms: 20,
    ttl_ms: 60,
};

/// Comfortably longer than one heartbeat TTL
#[allow(dead_code)]
pub const LAPSE: Duration = Duration::from_millis(200);

pub const WAIT: Duration = Duration::from_millis(100);

/// Install a test subscriber once; honours `RUST_LOG`
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A queue and the store behind it
#[allow(dead_code)]
pub struct TestQueue {
    pub store: InMemoryStore,
    pub queue: Queue,
}

#[allow(dead_code)]
impl TestQueue {
    pub fn new(name: &str) -> Self {
        init_tracing();
        let store = InMemoryStore::new();
        let queue = Self::handle_on(&store, name);
        tracing::debug!(queue = name, "Created test queue");
        Self { store, queue }
    }

    /// Another handle to the same queue, as a second process would hold
    pub fn handle_on(store: &InMemoryStore, name: &str) -> Queue {
        let store: Arc<dyn KeyValueStore> = Arc::new(store.clone());
        Queue::new(QueueName::new(name.to_string()).unwrap(), store).with_heartbeat(FAST_HEARTBEAT)
    }

    pub async fn consumer(&self, name: &str) -> Consumer {
        self.queue
            .add_consumer(ConsumerName::new(name.to_string()).unwrap())
            .await
            .expect("consumer registration should succeed")
    }

    pub async fn put(&self, payload: &str) -> Message {
        let message = Message::new(Bytes::copy_from_slice(payload.as_bytes()));
        self.queue.put(&message).await.expect("put should succeed");
        message
    }

    pub async fn counter(&self, key: &str) -> i64 {
        self.store.increment_counter(key, 0).await.unwrap()
    }
}

/// Payload of a delivered message as text
#[allow(dead_code)]
pub fn text(message: &Message) -> &str {
    message.payload_str().expect("test payloads are UTF-8")
}
