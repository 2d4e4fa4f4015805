//! Store key derivation.
//!
//! Every key is a pure function of the queue name (and consumer name where
//! applicable), so any process holding the names addresses the same data.

use crate::message::{ConsumerName, QueueName};

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;

/// Keys shared by all consumers of a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    queue: QueueName,
}

impl QueueKeys {
    pub fn new(queue: QueueName) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &QueueName {
        &self.queue
    }

    /// Set of every consumer name ever registered on the queue
    pub fn consumers(&self) -> String {
        format!("{}:consumers", self.queue)
    }

    /// Not-yet-delivered messages
    pub fn input(&self) -> String {
        format!("{}:input", self.queue)
    }

    /// Messages marked non-retryable
    pub fn failed(&self) -> String {
        format!("{}:failed", self.queue)
    }

    pub fn input_rate(&self) -> String {
        format!("{}:rate:input", self.queue)
    }

    /// Derive the private keys of one consumer
    pub fn consumer(&self, name: &ConsumerName) -> ConsumerKeys {
        ConsumerKeys {
            working: format!("{}:working:{}", self.queue, name),
            heartbeat: format!("{}:heartbeat:{}", self.queue, name),
            working_rate: format!("{}:rate:working:{}", self.queue, name),
        }
    }
}

/// Keys owned by a single consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerKeys {
    working: String,
    heartbeat: String,
    working_rate: String,
}

impl ConsumerKeys {
    /// Messages checked out but not yet acknowledged
    pub fn working(&self) -> &str {
        &self.working
    }

    /// Expiring liveness marker
    pub fn heartbeat(&self) -> &str {
        &self.heartbeat
    }

    pub fn working_rate(&self) -> &str {
        &self.working_rate
    }
}
