//! Consumers and the message lifecycle.
//!
//! A consumer moves messages from the queue's input list into its private
//! working list, where they stay until the application resolves them:
//!
//! ```text
//!            get / try_get / multi_get            ack
//!   input ─────────────────────────────► working ─────► (gone)
//!     ▲                                   │   ▲
//!     └──────────── requeue ──────────────┘   │ get_failed
//!                                   fail │    │
//!                                        ▼    │
//!                                       failed
//! ```
//!
//! Every arrow is a single atomic store command, so a message is always in
//! exactly one list and a crash can never lose it. Ack-family operations act
//! positionally on the tail of the working list; each first checks that the
//! tail holds the message it was given.

use crate::error::{QueueError, ValidationError};
use crate::heartbeat::Heartbeat;
use crate::keys::ConsumerKeys;
use crate::message::{ConsumerName, Message};
use crate::queue::Queue;
use crate::rate::RateCounter;
use crate::store::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;

/// A registered consumer of a [`Queue`].
///
/// The heartbeat runs for as long as this value lives. Dropping a consumer
/// with unacknowledged messages is indistinguishable from a crash: the
/// messages stay in the working list until a consumer of the same name
/// recovers them with [`requeue_all_unacked`](Self::requeue_all_unacked).
#[derive(Debug)]
pub struct Consumer {
    name: ConsumerName,
    queue: Queue,
    keys: ConsumerKeys,
    working_rate: RateCounter,
    heartbeat: Heartbeat,
}

impl Consumer {
    /// Register `name` on `queue` and start its heartbeat.
    ///
    /// A name already in the registry may only be reused once its previous
    /// owner's heartbeat has lapsed. Returns after the first heartbeat write,
    /// so a registered consumer is always observably alive.
    ///
    /// Two processes racing for the same dead name can both succeed; nothing
    /// guards the working list after registration.
    ///
    /// # Errors
    ///
    /// - [`QueueError::NameConflict`] if the name belongs to a live consumer
    /// - [`QueueError::ConfigurationError`] for invalid heartbeat timings
    /// - [`QueueError::Store`] if the registry or first heartbeat write fails
    #[instrument(skip_all, fields(queue = %queue.name(), consumer = %name))]
    pub async fn register(queue: &Queue, name: ConsumerName) -> Result<Self, QueueError> {
        // Checked again by Heartbeat::start, but only this check precedes the
        // registry write.
        queue.heartbeat_config().validate()?;

        let store = queue.store();
        let added = store
            .add_to_set(&queue.keys().consumers(), name.as_str())
            .await?;

        if !added {
            if queue.is_active_consumer(&name).await? {
                return Err(QueueError::NameConflict {
                    queue: queue.name().to_string(),
                    consumer: name.to_string(),
                });
            }
            info!("Reclaiming name of an inactive consumer");
        }

        let keys = queue.keys().consumer(&name);
        let heartbeat = Heartbeat::start(
            Arc::clone(store),
            keys.heartbeat().to_string(),
            queue.heartbeat_config().clone(),
        )
        .await?;
        let working_rate = RateCounter::new(Arc::clone(store), keys.working_rate().to_string());

        info!("Consumer registered");
        Ok(Self {
            name,
            queue: queue.clone(),
            keys,
            working_rate,
            heartbeat,
        })
    }

    pub fn name(&self) -> &ConsumerName {
        &self.name
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Key of this consumer's working list, for administrative tooling
    pub fn working_key(&self) -> &str {
        self.keys.working()
    }

    pub fn heartbeat_key(&self) -> &str {
        self.heartbeat.key()
    }

    /// Whether this consumer's heartbeat marker is currently present
    pub async fn is_alive(&self) -> Result<bool, QueueError> {
        self.queue.is_active_consumer(&self.name).await
    }

    fn store(&self) -> &Arc<dyn KeyValueStore> {
        self.queue.store()
    }

    // ------------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------------

    /// Move the next input message into the working list, waiting up to
    /// `timeout` for one to arrive. A zero timeout makes a single attempt.
    ///
    /// # Errors
    ///
    /// - [`QueueError::UnackedPending`] if earlier messages are unresolved
    /// - [`QueueError::Timeout`] if nothing arrived in time; safe to retry
    /// - [`QueueError::SerializationError`] if the payload cannot be decoded;
    ///   the raw value stays in the working list
    pub async fn get(&self, timeout: Duration) -> Result<Message, QueueError> {
        self.ensure_no_unacked().await?;

        let raw = self
            .store()
            .blocking_pop_and_push(&self.queue.keys().input(), self.keys.working(), timeout)
            .await?
            .ok_or(QueueError::Timeout { duration: timeout })?;

        self.working_rate.record(1).await;
        self.delivered(&raw)
    }

    /// Non-blocking [`get`](Self::get): `Ok(None)` when the input list is empty
    pub async fn try_get(&self) -> Result<Option<Message>, QueueError> {
        self.ensure_no_unacked().await?;

        let Some(raw) = self
            .store()
            .pop_and_push(&self.queue.keys().input(), self.keys.working())
            .await?
        else {
            return Ok(None);
        };

        self.working_rate.record(1).await;
        self.delivered(&raw).map(Some)
    }

    /// Fetch up to `count` messages in one round trip.
    ///
    /// Waits up to `timeout` for the first message only; the rest are taken
    /// if already present. The result is in delivery order, which is also the
    /// order they must be resolved in, and may be shorter than `count` or
    /// empty. The working-rate counter grows by `count` regardless of how
    /// many messages were actually returned.
    pub async fn multi_get(&self, count: usize, timeout: Duration) -> Result<Vec<Message>, QueueError> {
        if count == 0 {
            return Err(ValidationError::OutOfRange {
                field: "count".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }
        self.ensure_no_unacked().await?;

        let moved = self
            .store()
            .pop_and_push_batch(&self.queue.keys().input(), self.keys.working(), count, timeout)
            .await?;

        self.working_rate.record(count as u64).await;

        moved
            .into_iter()
            .flatten()
            .map(|raw| self.delivered(&raw))
            .collect()
    }

    /// Pull the oldest failed message back into the working list.
    ///
    /// Shares the unacked precondition of [`get`](Self::get). Returns
    /// `Ok(None)` when the failed list is empty.
    pub async fn get_failed(&self) -> Result<Option<Message>, QueueError> {
        self.ensure_no_unacked().await?;

        let Some(raw) = self
            .store()
            .pop_and_push(&self.queue.keys().failed(), self.keys.working())
            .await?
        else {
            return Ok(None);
        };

        self.working_rate.record(1).await;
        let message = self.delivered(&raw)?;
        info!(consumer = %self.name, message_id = %message.id, "Replaying failed message");
        Ok(Some(message))
    }

    fn delivered(&self, raw: &str) -> Result<Message, QueueError> {
        let message = Message::decode(raw)?;
        debug!(
            queue = %self.queue.name(),
            consumer = %self.name,
            message_id = %message.id,
            "Message checked out"
        );
        Ok(message)
    }

    // ------------------------------------------------------------------------
    // Unacked inspection and recovery
    // ------------------------------------------------------------------------

    pub async fn has_unacked(&self) -> Result<bool, QueueError> {
        Ok(self.unacked_count().await? > 0)
    }

    /// Number of messages in the working list
    pub async fn unacked_count(&self) -> Result<usize, QueueError> {
        Ok(self.store().length(self.keys.working()).await?)
    }

    /// Read, without removing, the message the next ack-family call acts on
    pub async fn peek_unacked(&self) -> Result<Message, QueueError> {
        let raw = self
            .store()
            .index(self.keys.working(), -1)
            .await?
            .ok_or_else(|| self.no_unacked())?;
        Ok(Message::decode(&raw)?)
    }

    /// Move every working-list message back to the input list.
    ///
    /// Values are moved one at a time without being decoded. An interrupted
    /// drain leaves the remainder in the working list, so calling this again
    /// simply continues. Returns the number of messages moved.
    pub async fn requeue_all_unacked(&self) -> Result<usize, QueueError> {
        let input = self.queue.keys().input();
        let mut requeued = 0;

        while self
            .store()
            .pop_and_push(self.keys.working(), &input)
            .await?
            .is_some()
        {
            self.queue.input_rate().record(1).await;
            requeued += 1;
        }

        if requeued > 0 {
            info!(consumer = %self.name, requeued, "Requeued unacknowledged messages");
        }
        Ok(requeued)
    }

    /// Delete the whole working list. The messages are gone for good.
    pub async fn discard_unacked(&self) -> Result<usize, QueueError> {
        let count = self.unacked_count().await?;
        self.store().delete(self.keys.working()).await?;

        if count > 0 {
            warn!(consumer = %self.name, count, "Discarded unacknowledged messages");
        }
        Ok(count)
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// Acknowledge `message`, removing it permanently
    pub async fn ack(&self, message: &Message) -> Result<(), QueueError> {
        self.ensure_tail(message).await?;
        self.store()
            .pop(self.keys.working())
            .await?
            .ok_or_else(|| self.no_unacked())?;

        debug!(consumer = %self.name, message_id = %message.id, "Message acknowledged");
        Ok(())
    }

    /// Return `message` to the input list for another attempt
    pub async fn requeue(&self, message: &Message) -> Result<(), QueueError> {
        self.ensure_tail(message).await?;
        self.store()
            .pop_and_push(self.keys.working(), &self.queue.keys().input())
            .await?
            .ok_or_else(|| self.no_unacked())?;
        self.queue.input_rate().record(1).await;

        debug!(consumer = %self.name, message_id = %message.id, "Message requeued");
        Ok(())
    }

    /// Park `message` in the shared failed list
    pub async fn fail(&self, message: &Message) -> Result<(), QueueError> {
        self.ensure_tail(message).await?;
        self.store()
            .pop_and_push(self.keys.working(), &self.queue.keys().failed())
            .await?
            .ok_or_else(|| self.no_unacked())?;

        warn!(consumer = %self.name, message_id = %message.id, "Message failed");
        Ok(())
    }

    async fn ensure_no_unacked(&self) -> Result<(), QueueError> {
        let count = self.unacked_count().await?;
        if count > 0 {
            return Err(QueueError::UnackedPending {
                consumer: self.name.to_string(),
                count,
            });
        }
        Ok(())
    }

    async fn ensure_tail(&self, message: &Message) -> Result<(), QueueError> {
        let found = self.peek_unacked().await?.id;
        if found != message.id {
            return Err(QueueError::MessageMismatch {
                expected: message.id.clone(),
                found,
            });
        }
        Ok(())
    }

    fn no_unacked(&self) -> QueueError {
        QueueError::NoUnacked {
            consumer: self.name.to_string(),
        }
    }
}
