//! Tests for named queues.

use super::*;
use crate::config::HeartbeatConfig;
use crate::stores::InMemoryStore;
use bytes::Bytes;

fn queue_on(store: &InMemoryStore) -> Queue {
    Queue::new(QueueName::new("jobs".to_string()).unwrap(), Arc::new(store.clone()))
        .with_heartbeat(HeartbeatConfig {
            interval_ms: 20,
            ttl_ms: 60,
        })
}

#[tokio::test]
async fn test_put_appends_encoded_envelope() {
    let store = InMemoryStore::new();
    let queue = queue_on(&store);
    let message = Message::new(Bytes::from("payload"));

    let id = queue.put(&message).await.unwrap();

    assert_eq!(id, message.id);
    let stored = store.list_contents("jobs:input").unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(Message::decode(&stored[0]).unwrap(), message);
}

#[tokio::test]
async fn test_put_counts_input_rate() {
    let store = InMemoryStore::new();
    let queue = queue_on(&store);

    queue.put(&Message::new(Bytes::from("a"))).await.unwrap();
    queue.put(&Message::new(Bytes::from("b"))).await.unwrap();

    assert_eq!(store.increment_counter("jobs:rate:input", 0).await.unwrap(), 2);
}

#[tokio::test]
async fn test_lengths_start_at_zero() {
    let store = InMemoryStore::new();
    let queue = queue_on(&store);

    assert_eq!(queue.input_length().await.unwrap(), 0);
    assert_eq!(queue.failed_length().await.unwrap(), 0);
}

#[tokio::test]
async fn test_put_propagates_store_errors() {
    let store = InMemoryStore::new();
    let queue = queue_on(&store);
    store.set_available(false);

    let result = queue.put(&Message::new(Bytes::from("lost?"))).await;

    assert!(matches!(result, Err(QueueError::Store(_))));
}

#[tokio::test]
async fn test_is_active_consumer_tracks_heartbeat() {
    let store = InMemoryStore::new();
    let queue = queue_on(&store);
    let name = ConsumerName::new("worker".to_string()).unwrap();

    assert!(!queue.is_active_consumer(&name).await.unwrap());

    let consumer = queue.add_consumer(name.clone()).await.unwrap();
    assert!(queue.is_active_consumer(&name).await.unwrap());

    drop(consumer);
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    assert!(!queue.is_active_consumer(&name).await.unwrap());
}

#[test]
fn test_debug_output_names_queue() {
    let queue = queue_on(&InMemoryStore::new());
    let debug = format!("{:?}", queue);
    assert!(debug.contains("jobs"), "{debug}");
}
