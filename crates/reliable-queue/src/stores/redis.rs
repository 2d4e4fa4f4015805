//! Redis key-value store.
//!
//! Maps the [`KeyValueStore`] primitives onto single Redis commands:
//!
//! | Primitive | Command |
//! |---|---|
//! | `append` | `LPUSH` |
//! | `pop` | `RPOP` |
//! | `pop_and_push` | `RPOPLPUSH` |
//! | `blocking_pop_and_push` | `BRPOPLPUSH` |
//! | `pop_and_push_batch` | pipelined `BRPOPLPUSH` + `RPOPLPUSH` |
//! | `add_to_set` | `SADD` |
//! | `set_with_ttl` | `SET .. PX` |
//! | `key_exists` | `EXISTS` |
//! | `length` | `LLEN` |
//! | `index` | `LINDEX` |
//! | `delete` | `DEL` |
//! | `increment_counter` | `INCRBY` |
//!
//! Fractional blocking timeouts require Redis 6.0 or later.
//!
//! Non-blocking commands share one multiplexed [`ConnectionManager`]. A
//! blocking command occupies its connection until it returns, so each one runs
//! on a freshly opened connection; otherwise a long poll would stall every
//! heartbeat write queued behind it.
//!
//! ## Example
//!
//! ```no_run
//! use reliable_queue::{Queue, QueueName, RedisStore, StoreConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisStore::connect(&StoreConfig::default()).await?;
//! let queue = Queue::new(QueueName::new("jobs".to_string())?, Arc::new(store));
//! # Ok(())
//! # }
//! ```

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::{Client, ErrorKind, RedisError};
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
#[path = "redis_tests.rs"]
mod tests;

impl From<RedisError> for StoreError {
    fn from(error: RedisError) -> Self {
        if error.kind() == ErrorKind::IoError
            || error.is_io_error()
            || error.is_connection_dropped()
            || error.is_connection_refusal()
        {
            StoreError::ConnectionFailed {
                message: error.to_string(),
            }
        } else {
            StoreError::CommandFailed {
                command: error.code().unwrap_or("redis").to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// Longest blocking timeout sent to the server; longer waits are clamped.
const MAX_BLOCKING_TIMEOUT: Duration = Duration::from_secs(i32::MAX as u64);

/// Convert a non-zero timeout into the seconds argument of a blocking command.
///
/// The server truncates the value to whole milliseconds and reads zero as
/// "forever". The timeout is therefore rounded up to at least one millisecond
/// and sent half a millisecond above that, so truncation lands exactly on it.
fn timeout_seconds(timeout: Duration) -> f64 {
    let millis = timeout
        .min(MAX_BLOCKING_TIMEOUT)
        .as_nanos()
        .div_ceil(1_000_000)
        .max(1);
    (millis as f64 + 0.5) / 1_000.0
}

/// Redis-backed [`KeyValueStore`]
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    connection: ConnectionManager,
    connect_timeout: Duration,
}

impl RedisStore {
    /// Open a client and establish the shared connection
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            StoreError::ConnectionFailed {
                message: format!("invalid store url: {}", e),
            }
        })?;
        let connect_timeout = config.connect_timeout();

        let connection = tokio::time::timeout(connect_timeout, ConnectionManager::new(client.clone()))
            .await
            .map_err(|_| StoreError::ConnectionFailed {
                message: format!("timed out after {:?} connecting to store", connect_timeout),
            })??;

        debug!(url = %config.url, "Connected to redis store");

        Ok(Self {
            client,
            connection,
            connect_timeout,
        })
    }

    fn shared(&self) -> ConnectionManager {
        self.connection.clone()
    }

    async fn dedicated(&self) -> Result<MultiplexedConnection, StoreError> {
        tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| StoreError::ConnectionFailed {
            message: format!(
                "timed out after {:?} opening blocking connection",
                self.connect_timeout
            ),
        })?
        .map_err(StoreError::from)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn append(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _: i64 = redis::cmd("LPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut self.shared())
            .await?;
        Ok(())
    }

    async fn pop(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = redis::cmd("RPOP")
            .arg(key)
            .query_async(&mut self.shared())
            .await?;
        Ok(value)
    }

    async fn pop_and_push(&self, src: &str, dst: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = redis::cmd("RPOPLPUSH")
            .arg(src)
            .arg(dst)
            .query_async(&mut self.shared())
            .await?;
        Ok(value)
    }

    async fn blocking_pop_and_push(
        &self,
        src: &str,
        dst: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        if timeout.is_zero() {
            return self.pop_and_push(src, dst).await;
        }

        let mut connection = self.dedicated().await?;
        let value: Option<String> = redis::cmd("BRPOPLPUSH")
            .arg(src)
            .arg(dst)
            .arg(timeout_seconds(timeout))
            .query_async(&mut connection)
            .await?;
        Ok(value)
    }

    async fn pop_and_push_batch(
        &self,
        src: &str,
        dst: &str,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<Option<String>>, StoreError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        if timeout.is_zero() {
            pipe.cmd("RPOPLPUSH").arg(src).arg(dst);
        } else {
            pipe.cmd("BRPOPLPUSH")
                .arg(src)
                .arg(dst)
                .arg(timeout_seconds(timeout));
        }
        for _ in 1..count {
            pipe.cmd("RPOPLPUSH").arg(src).arg(dst);
        }

        let results: Vec<Option<String>> = if timeout.is_zero() {
            pipe.query_async(&mut self.shared()).await?
        } else {
            pipe.query_async(&mut self.dedicated().await?).await?
        };

        if results.len() != count {
            return Err(StoreError::UnexpectedResponse {
                command: "BRPOPLPUSH".to_string(),
                message: format!("expected {} replies, got {}", count, results.len()),
            });
        }
        Ok(results)
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let added: i64 = redis::cmd("SADD")
            .arg(key)
            .arg(member)
            .query_async(&mut self.shared())
            .await?;
        Ok(added == 1)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut self.shared())
            .await?;
        Ok(())
    }

    async fn key_exists(&self, key: &str) -> Result<bool, StoreError> {
        let exists: i64 = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut self.shared())
            .await?;
        Ok(exists > 0)
    }

    async fn length(&self, key: &str) -> Result<usize, StoreError> {
        let length: usize = redis::cmd("LLEN")
            .arg(key)
            .query_async(&mut self.shared())
            .await?;
        Ok(length)
    }

    async fn index(&self, key: &str, position: i64) -> Result<Option<String>, StoreError> {
        let value: Option<String> = redis::cmd("LINDEX")
            .arg(key)
            .arg(position)
            .query_async(&mut self.shared())
            .await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut self.shared())
            .await?;
        Ok(())
    }

    async fn increment_counter(&self, key: &str, amount: i64) -> Result<i64, StoreError> {
        let total: i64 = redis::cmd("INCRBY")
            .arg(key)
            .arg(amount)
            .query_async(&mut self.shared())
            .await?;
        Ok(total)
    }
}
