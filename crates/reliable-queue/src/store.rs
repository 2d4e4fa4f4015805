//! Backing store abstraction.
//!
//! The queue protocol needs nothing beyond the primitives below, each of which
//! must be atomic on the store side. Lists follow Redis orientation: values
//! are appended at the head and popped from the tail, so a list drains in
//! FIFO order and `index(key, -1)` names the element the next pop returns.

use crate::error::StoreError;
use async_trait::async_trait;
use std::time::Duration;

/// Atomic key-value primitives used by queues and consumers
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Push a value onto the head of a list
    async fn append(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove and return the tail of a list
    async fn pop(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Atomically move the tail of `src` onto the head of `dst`
    async fn pop_and_push(&self, src: &str, dst: &str) -> Result<Option<String>, StoreError>;

    /// Like [`pop_and_push`](Self::pop_and_push) but waits up to `timeout`
    /// for `src` to become non-empty. A zero timeout never blocks.
    async fn blocking_pop_and_push(
        &self,
        src: &str,
        dst: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError>;

    /// One blocking move followed by `count - 1` non-blocking moves, issued as
    /// a single round trip. The result holds one slot per attempted move.
    async fn pop_and_push_batch(
        &self,
        src: &str,
        dst: &str,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<Option<String>>, StoreError>;

    /// Add a member to a set, returning `false` if it was already present
    async fn add_to_set(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Write a value that expires after `ttl`
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), StoreError>;

    async fn key_exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Length of a list; missing keys have length zero
    async fn length(&self, key: &str) -> Result<usize, StoreError>;

    /// Read a list element without removing it. Negative positions count from
    /// the tail.
    async fn index(&self, key: &str, position: i64) -> Result<Option<String>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Add `amount` to an integer counter and return the new total
    async fn increment_counter(&self, key: &str, amount: i64) -> Result<i64, StoreError>;
}
