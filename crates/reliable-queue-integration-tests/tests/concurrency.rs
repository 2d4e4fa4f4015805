//! Integration tests for concurrent consumers sharing a queue
//!
//! These tests verify:
//! - Every message is delivered to exactly one consumer
//! - Nothing is lost or duplicated when consumers race

mod common;

use common::{text, TestQueue, WAIT};
use std::collections::HashSet;

const MESSAGES: usize = 200;
const WORKERS: usize = 4;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_competing_consumers_each_message_once() {
    let fx = TestQueue::new("race");
    for i in 0..MESSAGES {
        fx.put(&format!("job-{i}")).await;
    }

    let mut workers = Vec::new();
    for w in 0..WORKERS {
        let consumer = fx.consumer(&format!("worker-{w}")).await;
        workers.push(tokio::spawn(async move {
            let mut seen = Vec::new();
            loop {
                match consumer.get(WAIT).await {
                    Ok(message) => {
                        seen.push(text(&message).to_string());
                        consumer.ack(&message).await.unwrap();
                    }
                    Err(e) if e.is_timeout() => break,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
            seen
        }));
    }

    let mut all = Vec::new();
    for worker in workers {
        all.extend(worker.await.unwrap());
    }

    let unique: HashSet<&String> = all.iter().collect();
    assert_eq!(all.len(), MESSAGES);
    assert_eq!(unique.len(), MESSAGES);
    assert_eq!(fx.queue.input_length().await.unwrap(), 0);
}

/// Producers and consumers running at the same time lose nothing
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_put_and_get() {
    let fx = TestQueue::new("stream");
    let consumer = fx.consumer("worker").await;
    let producer = fx.queue.clone();

    let producing = tokio::spawn(async move {
        for i in 0..50 {
            let message = reliable_queue::Message::new(bytes::Bytes::from(format!("{i}")));
            producer.put(&message).await.unwrap();
            tokio::task::yield_now().await;
        }
    });

    let mut received = Vec::new();
    while received.len() < 50 {
        let message = consumer
            .get(std::time::Duration::from_secs(5))
            .await
            .unwrap();
        received.push(text(&message).parse::<usize>().unwrap());
        consumer.ack(&message).await.unwrap();
    }
    producing.await.unwrap();

    assert_eq!(received, (0..50).collect::<Vec<_>>());
}
