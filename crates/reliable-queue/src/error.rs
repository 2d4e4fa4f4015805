//! Error types for queue operations.

use crate::message::MessageId;
use std::time::Duration;
use thiserror::Error;

/// Comprehensive error type for all queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Consumer '{consumer}' is already active on queue '{queue}'")]
    NameConflict { queue: String, consumer: String },

    #[error("Consumer '{consumer}' has {count} unacknowledged message(s)")]
    UnackedPending { consumer: String, count: usize },

    #[error("Consumer '{consumer}' has no unacknowledged messages")]
    NoUnacked { consumer: String },

    #[error("No message available after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Working list tail holds {found} but operation targets {expected}")]
    MessageMismatch {
        expected: MessageId,
        found: MessageId,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization failed: {0}")]
    SerializationError(#[from] SerializationError),

    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),
}

impl QueueError {
    /// Check whether this is a fetch timeout, which long-poll loops retry
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NameConflict { .. } => true, // the other holder may die
            Self::UnackedPending { .. } => false,
            Self::NoUnacked { .. } => false,
            Self::Timeout { .. } => true,
            Self::MessageMismatch { .. } => false,
            Self::Store(e) => e.is_transient(),
            Self::SerializationError(_) => false,
            Self::ConfigurationError(_) => false,
            Self::ValidationError(_) => false,
        }
    }

    /// Get suggested retry delay
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::NameConflict { .. } => Some(Duration::from_secs(1)),
            Self::Timeout { .. } => Some(Duration::ZERO),
            Self::Store(StoreError::ConnectionFailed { .. }) => Some(Duration::from_secs(5)),
            _ => None,
        }
    }
}

/// Failures reported by the backing key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Command {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Unexpected response to {command}: {message}")]
    UnexpectedResponse { command: String, message: String },

    #[error("Store internal error: {message}")]
    Internal { message: String },
}

impl StoreError {
    /// Check if the failure is likely to clear up on its own
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. })
    }
}

/// Errors during message serialization/deserialization
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Message payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
