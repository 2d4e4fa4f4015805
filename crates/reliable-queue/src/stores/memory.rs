//! In-memory key-value store for testing and development.
//!
//! This module provides a fully functional implementation of [`KeyValueStore`]
//! that:
//! - Keeps lists, sets, counters and expiring values in one keyspace
//! - Wakes blocked pops as soon as any list receives a value
//! - Expires TTL keys lazily on access
//! - Can simulate an outage so callers can exercise store failures
//!
//! This store is intended for:
//! - Unit and integration testing of consumers
//! - Development without a running server
//! - Reference semantics for networked stores

use crate::error::StoreError;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// A single key's value
enum Entry {
    List(VecDeque<String>),
    Set(HashSet<String>),
    Value {
        value: String,
        expires_at: Option<Instant>,
    },
}

impl Entry {
    fn is_expired(&self) -> bool {
        match self {
            Entry::Value {
                expires_at: Some(at),
                ..
            } => Instant::now() >= *at,
            _ => false,
        }
    }
}

fn wrong_type(command: &str, key: &str) -> StoreError {
    StoreError::CommandFailed {
        command: command.to_string(),
        message: format!(
            "WRONGTYPE operation against key '{}' holding the wrong kind of value",
            key
        ),
    }
}

/// Keyspace shared by every handle to the store
#[derive(Default)]
struct StoreState {
    entries: HashMap<String, Entry>,
}

impl StoreState {
    /// Look up a key, dropping it first if its TTL has passed
    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        if self.entries.get(key).is_some_and(Entry::is_expired) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn list(&mut self, key: &str, command: &str) -> Result<Option<&mut VecDeque<String>>, StoreError> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry::List(list)) => Ok(Some(list)),
            Some(_) => Err(wrong_type(command, key)),
        }
    }

    fn ensure_list_or_absent(&mut self, key: &str, command: &str) -> Result<(), StoreError> {
        self.list(key, command).map(|_| ())
    }

    fn push_head(&mut self, key: &str, value: String, command: &str) -> Result<(), StoreError> {
        self.ensure_list_or_absent(key, command)?;
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(VecDeque::new()))
        {
            Entry::List(list) => {
                list.push_front(value);
                Ok(())
            }
            _ => Err(wrong_type(command, key)),
        }
    }

    /// Empty lists cease to exist, as they do in Redis
    fn pop_tail(&mut self, key: &str, command: &str) -> Result<Option<String>, StoreError> {
        let (value, now_empty) = match self.list(key, command)? {
            Some(list) => {
                let value = list.pop_back();
                (value, list.is_empty())
            }
            None => (None, false),
        };
        if now_empty {
            self.entries.remove(key);
        }
        Ok(value)
    }

    fn move_tail(&mut self, src: &str, dst: &str, command: &str) -> Result<Option<String>, StoreError> {
        // Check the destination first so a type error never loses the value.
        self.ensure_list_or_absent(dst, command)?;
        let value = self.pop_tail(src, command)?;
        if let Some(ref value) = value {
            self.push_head(dst, value.clone(), command)?;
        }
        Ok(value)
    }
}

// ============================================================================
// InMemoryStore
// ============================================================================

/// In-memory key-value store. Clones share the same keyspace.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
    list_written: Arc<Notify>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while unavailable every operation fails with
    /// [`StoreError::ConnectionFailed`]
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Snapshot a list from head to tail
    pub fn list_contents(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut state = self.write()?;
        Ok(state
            .list(key, "LRANGE")?
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionFailed {
                message: "in-memory store is marked unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, StoreError> {
        self.check_available()?;
        self.state.read().map_err(|e| StoreError::Internal {
            message: format!("Failed to acquire read lock: {}", e),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, StoreError> {
        self.check_available()?;
        self.state.write().map_err(|e| StoreError::Internal {
            message: format!("Failed to acquire write lock: {}", e),
        })
    }

    fn try_move(&self, src: &str, dst: &str, command: &str) -> Result<Option<String>, StoreError> {
        let moved = self.write()?.move_tail(src, dst, command)?;
        if moved.is_some() {
            self.list_written.notify_waiters();
        }
        Ok(moved)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn append(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write()?.push_head(key, value.to_string(), "LPUSH")?;
        self.list_written.notify_waiters();
        Ok(())
    }

    async fn pop(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.write()?.pop_tail(key, "RPOP")
    }

    async fn pop_and_push(&self, src: &str, dst: &str) -> Result<Option<String>, StoreError> {
        self.try_move(src, dst, "RPOPLPUSH")
    }

    async fn blocking_pop_and_push(
        &self,
        src: &str,
        dst: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        // A timeout too large to express as an instant waits without bound.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            // Register interest before checking so a concurrent append
            // between the check and the wait is not missed.
            let notified = self.list_written.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.try_move(src, dst, "BRPOPLPUSH")? {
                return Ok(Some(value));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn pop_and_push_batch(
        &self,
        src: &str,
        dst: &str,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<Option<String>>, StoreError> {
        let mut results = Vec::with_capacity(count);
        if count == 0 {
            return Ok(results);
        }

        results.push(self.blocking_pop_and_push(src, dst, timeout).await?);

        let mut moved_any = false;
        {
            let mut state = self.write()?;
            for _ in 1..count {
                let moved = state.move_tail(src, dst, "RPOPLPUSH")?;
                moved_any |= moved.is_some();
                results.push(moved);
            }
        }
        if moved_any {
            self.list_written.notify_waiters();
        }

        Ok(results)
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        match state.live(key) {
            None => {}
            Some(Entry::Set(set)) => return Ok(set.insert(member.to_string())),
            Some(_) => return Err(wrong_type("SADD", key)),
        }
        let set = HashSet::from([member.to_string()]);
        state.entries.insert(key.to_string(), Entry::Set(set));
        Ok(true)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Err(StoreError::CommandFailed {
                command: "SET".to_string(),
                message: "invalid expire time".to_string(),
            });
        }

        self.write()?.entries.insert(
            key.to_string(),
            Entry::Value {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn key_exists(&self, key: &str) -> Result<bool, StoreError> {
        let state = self.read()?;
        Ok(state
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired()))
    }

    async fn length(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self
            .write()?
            .list(key, "LLEN")?
            .map(|list| list.len())
            .unwrap_or(0))
    }

    async fn index(&self, key: &str, position: i64) -> Result<Option<String>, StoreError> {
        let mut state = self.write()?;
        let Some(list) = state.list(key, "LINDEX")? else {
            return Ok(None);
        };

        let len = list.len() as i64;
        let resolved = if position < 0 { len + position } else { position };
        if resolved < 0 || resolved >= len {
            return Ok(None);
        }
        Ok(list.get(resolved as usize).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.write()?.entries.remove(key);
        Ok(())
    }

    async fn increment_counter(&self, key: &str, amount: i64) -> Result<i64, StoreError> {
        let mut state = self.write()?;
        let current = match state.live(key) {
            None => 0,
            Some(Entry::Value { value, .. }) => {
                value
                    .parse::<i64>()
                    .map_err(|_| StoreError::CommandFailed {
                        command: "INCRBY".to_string(),
                        message: "value is not an integer or out of range".to_string(),
                    })?
            }
            Some(_) => return Err(wrong_type("INCRBY", key)),
        };

        let total = current
            .checked_add(amount)
            .ok_or_else(|| StoreError::CommandFailed {
                command: "INCRBY".to_string(),
                message: "increment or decrement would overflow".to_string(),
            })?;
        state.entries.insert(
            key.to_string(),
            Entry::Value {
                value: total.to_string(),
                expires_at: None,
            },
        );
        Ok(total)
    }
}
