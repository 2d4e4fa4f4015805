//! Tests for configuration defaults, validation and loading.

use super::*;
use serial_test::serial;
use std::io::Write;

// ============================================================================
// HeartbeatConfig tests
// ============================================================================

mod heartbeat_config_tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_timings() {
        let config = HeartbeatConfig::default();
        assert_eq!(config.interval(), Duration::from_millis(500));
        assert_eq!(config.ttl(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    /// An interval equal to the TTL leaves no grace window.
    #[test]
    fn test_interval_not_below_ttl_fails() {
        let config = HeartbeatConfig {
            interval_ms: 1_000,
            ttl_ms: 1_000,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::Invalid { .. })
        ));
    }

    #[test]
    fn test_zero_interval_fails() {
        let config = HeartbeatConfig {
            interval_ms: 0,
            ttl_ms: 1_000,
        };
        assert!(config.validate().is_err());
    }
}

// ============================================================================
// StoreConfig tests
// ============================================================================

mod store_config_tests {
    use super::*;

    #[test]
    fn test_empty_url_is_missing() {
        let config = StoreConfig {
            url: "  ".to_string(),
            ..StoreConfig::default()
        };
        match config.validate() {
            Err(ConfigurationError::Missing { key }) => assert_eq!(key, "store.url"),
            other => panic!("Expected Missing, got: {:?}", other),
        }
    }

    #[test]
    fn test_connect_timeout_conversion() {
        let config = StoreConfig {
            connect_timeout_ms: 250,
            ..StoreConfig::default()
        };
        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
    }
}

// ============================================================================
// RuntimeConfig loading tests
// ============================================================================

mod runtime_config_tests {
    use super::*;

    const TTL_VAR: &str = "RELIABLE_QUEUE__HEARTBEAT__TTL_MS";

    #[test]
    #[serial]
    fn test_load_without_sources_uses_defaults() {
        std::env::remove_var(TTL_VAR);
        let config = RuntimeConfig::load(None).unwrap();
        assert_eq!(config.heartbeat, HeartbeatConfig::default());
        assert_eq!(config.store.url, StoreConfig::default().url);
    }

    #[test]
    #[serial]
    fn test_load_reads_partial_file() {
        std::env::remove_var(TTL_VAR);
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "store:\n  url: redis://queue-host:6380\nheartbeat:\n  interval_ms: 200")
            .unwrap();

        let config = RuntimeConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.store.url, "redis://queue-host:6380");
        assert_eq!(config.heartbeat.interval_ms, 200);
        assert_eq!(config.heartbeat.ttl_ms, 1_000);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "heartbeat:\n  ttl_ms: 3000").unwrap();
        std::env::set_var(TTL_VAR, "4000");

        let config = RuntimeConfig::load(Some(file.path()));
        std::env::remove_var(TTL_VAR);

        assert_eq!(config.unwrap().heartbeat.ttl_ms, 4_000);
    }

    #[test]
    #[serial]
    fn test_load_rejects_invalid_heartbeat() {
        std::env::remove_var(TTL_VAR);
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "heartbeat:\n  interval_ms: 2000\n  ttl_ms: 1000").unwrap();

        let result = RuntimeConfig::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigurationError::Invalid { .. })));
    }

    #[test]
    #[serial]
    fn test_explicit_missing_file_is_an_error() {
        let result = RuntimeConfig::load(Some(Path::new("/nonexistent/reliable-queue.yaml")));
        assert!(matches!(result, Err(ConfigurationError::Parsing { .. })));
    }
}
