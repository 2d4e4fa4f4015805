//! # Reliable Queue
//!
//! At-least-once work queue built from the atomic list, set and expiring-key
//! primitives of a remote key-value store.
//!
//! This library provides:
//! - Producer-side appends onto a named queue
//! - Consumers that check messages out into a private working list
//! - Acknowledge, requeue and fail transitions, each a single atomic move
//! - Heartbeat-based liveness and consumer name reclamation
//! - Recovery of messages left behind by a crashed consumer
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Message envelope and identifiers
//! - [`keys`] - Store key derivation
//! - [`store`] - Backing store trait
//! - [`stores`] - In-memory and Redis store implementations
//! - [`queue`] - Named queues and the producer side
//! - [`consumer`] - Consumer registration and message lifecycle
//! - [`heartbeat`] - Consumer liveness task
//! - [`rate`] - Best-effort throughput counters
//! - [`config`] - Configuration types and loading
//!
//! ## Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use reliable_queue::{ConsumerName, InMemoryStore, Message, Queue, QueueName};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = Queue::new(QueueName::new("jobs".to_string())?, Arc::new(InMemoryStore::new()));
//! queue.put(&Message::new(Bytes::from("resize image 42"))).await?;
//!
//! let consumer = queue.add_consumer(ConsumerName::new("worker-1".to_string())?).await?;
//! loop {
//!     match consumer.get(Duration::from_secs(1)).await {
//!         Ok(message) => {
//!             // ... process ...
//!             consumer.ack(&message).await?;
//!         }
//!         Err(e) if e.is_timeout() => continue,
//!         Err(e) => return Err(e.into()),
//!     }
//! }
//! # }
//! ```

pub mod config;
pub mod consumer;
pub mod error;
pub mod heartbeat;
pub mod keys;
pub mod message;
pub mod queue;
pub mod rate;
pub mod store;
pub mod stores;

// Re-export commonly used types at crate root for convenience
pub use config::{HeartbeatConfig, RuntimeConfig, StoreConfig};
pub use consumer::Consumer;
pub use error::{ConfigurationError, QueueError, SerializationError, StoreError, ValidationError};
pub use heartbeat::Heartbeat;
pub use keys::{ConsumerKeys, QueueKeys};
pub use message::{ConsumerName, Message, MessageId, QueueName, Timestamp};
pub use queue::Queue;
pub use rate::RateCounter;
pub use store::KeyValueStore;
pub use stores::InMemoryStore;
#[cfg(feature = "redis")]
pub use stores::RedisStore;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
