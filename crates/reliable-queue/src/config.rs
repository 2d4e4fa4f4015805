//! Configuration types for queues, consumers and the backing store.
//!
//! All fields carry serde defaults, so an absent file or an unconfigured
//! environment yields a working configuration.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Prefix of environment variables read by [`RuntimeConfig::load`]
pub const ENV_PREFIX: &str = "RELIABLE_QUEUE";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Backing store connection settings
    pub store: StoreConfig,

    /// Consumer liveness settings
    pub heartbeat: HeartbeatConfig,
}

impl RuntimeConfig {
    /// Load configuration from an optional file overlaid with environment
    /// variables such as `RELIABLE_QUEUE__HEARTBEAT__TTL_MS=2000`.
    ///
    /// A missing file is fine when no path is given; an explicit path must
    /// exist. The result is validated before it is returned.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: RuntimeConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigurationError::Parsing {
                message: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.store.validate()?;
        self.heartbeat.validate()
    }
}

/// Backing store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379/0`
    pub url: String,

    /// Upper bound on establishing a connection, in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connect_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.url.trim().is_empty() {
            return Err(ConfigurationError::Missing {
                key: "store.url".to_string(),
            });
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigurationError::Invalid {
                message: "store.connect_timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Consumer heartbeat configuration.
///
/// The marker key lives for `ttl_ms` and is rewritten every `interval_ms`;
/// the difference is the grace window in which a dropped write goes
/// unnoticed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Delay between marker writes, in milliseconds
    pub interval_ms: u64,

    /// Marker expiry, in milliseconds
    pub ttl_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            ttl_ms: 1_000,
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// The interval must be non-zero and strictly shorter than the TTL
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.interval_ms == 0 {
            return Err(ConfigurationError::Invalid {
                message: "heartbeat.interval_ms must be greater than zero".to_string(),
            });
        }
        if self.interval_ms >= self.ttl_ms {
            return Err(ConfigurationError::Invalid {
                message: format!(
                    "heartbeat.interval_ms ({}) must be less than heartbeat.ttl_ms ({})",
                    self.interval_ms, self.ttl_ms
                ),
            });
        }
        Ok(())
    }
}
