//! Key-value store implementations.
//!
//! This module contains concrete implementations of the `KeyValueStore`
//! trait for different backends.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
