//! Tests for the liveness heartbeat.

use super::*;
use crate::error::ConfigurationError;
use crate::stores::InMemoryStore;
use std::time::Duration;

fn fast_config() -> HeartbeatConfig {
    HeartbeatConfig {
        interval_ms: 20,
        ttl_ms: 60,
    }
}

#[tokio::test]
async fn test_start_returns_after_first_write() {
    let store = InMemoryStore::new();

    let heartbeat = Heartbeat::start(Arc::new(store.clone()), "q:heartbeat:a".to_string(), fast_config())
        .await
        .unwrap();

    assert_eq!(heartbeat.key(), "q:heartbeat:a");
    assert!(heartbeat.is_running());
    assert!(store.key_exists("q:heartbeat:a").await.unwrap());
}

/// The marker outlives many TTL periods while the task runs.
#[tokio::test]
async fn test_marker_is_kept_alive() {
    let store = InMemoryStore::new();
    let _heartbeat = Heartbeat::start(Arc::new(store.clone()), "marker".to_string(), fast_config())
        .await
        .unwrap();

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.key_exists("marker").await.unwrap());
    }
}

/// Dropping the handle stops the writes and the marker lapses.
#[tokio::test]
async fn test_marker_lapses_after_drop() {
    let store = InMemoryStore::new();
    let heartbeat = Heartbeat::start(Arc::new(store.clone()), "marker".to_string(), fast_config())
        .await
        .unwrap();

    drop(heartbeat);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(!store.key_exists("marker").await.unwrap());
}

#[tokio::test]
async fn test_first_write_failure_is_reported() {
    let store = InMemoryStore::new();
    store.set_available(false);

    let result = Heartbeat::start(Arc::new(store.clone()), "marker".to_string(), fast_config()).await;

    assert!(matches!(
        result,
        Err(QueueError::Store(StoreError::ConnectionFailed { .. }))
    ));
}

/// A brief outage is tolerated; the task keeps running and rewrites the marker.
#[tokio::test]
async fn test_transient_write_failures_are_swallowed() {
    let store = InMemoryStore::new();
    let heartbeat = Heartbeat::start(Arc::new(store.clone()), "marker".to_string(), fast_config())
        .await
        .unwrap();

    store.set_available(false);
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.set_available(true);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(heartbeat.is_running());
    assert!(store.key_exists("marker").await.unwrap());
}

#[tokio::test]
async fn test_invalid_timing_is_rejected() {
    let store = InMemoryStore::new();
    let config = HeartbeatConfig {
        interval_ms: 100,
        ttl_ms: 100,
    };

    let result = Heartbeat::start(Arc::new(store.clone()), "marker".to_string(), config).await;

    assert!(matches!(
        result,
        Err(QueueError::ConfigurationError(ConfigurationError::Invalid { .. }))
    ));
    assert!(!store.key_exists("marker").await.unwrap());
}

#[tokio::test]
async fn test_zero_interval_is_rejected_without_spawning() {
    let store = InMemoryStore::new();
    let config = HeartbeatConfig {
        interval_ms: 0,
        ttl_ms: 100,
    };

    let result = Heartbeat::start(Arc::new(store.clone()), "marker".to_string(), config).await;

    assert!(matches!(
        result,
        Err(QueueError::ConfigurationError(ConfigurationError::Invalid { .. }))
    ));
    assert!(!store.key_exists("marker").await.unwrap());
}
