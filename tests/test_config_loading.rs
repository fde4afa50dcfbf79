//! Configuration loading tests
//!
//! Tests focus on the observable outcome of building configuration from an
//! environment snapshot.

use redis_publisher::config::{ConfigError, DeliveryMode, PublisherConfig};
use std::collections::HashMap;
use std::time::Duration;

fn from_pairs(pairs: &[(&str, &str)]) -> Result<PublisherConfig, ConfigError> {
    let env: HashMap<&str, &str> = pairs.iter().copied().collect();
    PublisherConfig::from_lookup(|name| env.get(name).map(|v| v.to_string()))
}

#[test]
fn test_config_defaults_match_documented_values() {
    let config = from_pairs(&[]).unwrap();

    assert_eq!(config.redis.host, "localhost");
    assert_eq!(config.redis.port, 6379);
    assert_eq!(config.publish.interval(), Duration::from_secs(2));
    assert_eq!(config.publish.pattern, DeliveryMode::Both);
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.delay, Duration::from_secs(5));
    assert_eq!(config.retry.error_pause, Duration::from_secs(1));
}

#[test]
fn test_config_from_full_environment() {
    let config = from_pairs(&[
        ("REDIS_HOST", "redis"),
        ("REDIS_PORT", "16379"),
        ("PUBLISH_INTERVAL", "0.5"),
        ("PATTERN", "pubsub"),
    ])
    .unwrap();

    assert_eq!(config.redis.url(), "redis://redis:16379/");
    assert_eq!(config.publish.interval(), Duration::from_millis(500));
    assert_eq!(config.publish.pattern, DeliveryMode::PubSub);
}

#[test]
fn test_config_unknown_pattern_rejected() {
    let result = from_pairs(&[("PATTERN", "broadcast")]);
    assert_eq!(
        result,
        Err(ConfigError::InvalidPattern("broadcast".to_string()))
    );
}

#[test]
fn test_config_error_messages_name_variable() {
    let error = from_pairs(&[("REDIS_PORT", "-1")]).unwrap_err();
    assert!(error.to_string().contains("REDIS_PORT"));

    let error = from_pairs(&[("PUBLISH_INTERVAL", "fast")]).unwrap_err();
    assert!(error.to_string().contains("PUBLISH_INTERVAL"));
}

#[test]
fn test_config_show_renders_toml() {
    let config = from_pairs(&[("PATTERN", "queue")]).unwrap();
    let rendered = config.to_toml().unwrap();

    assert!(rendered.contains("[redis]"));
    assert!(rendered.contains("host = \"localhost\""));
    assert!(rendered.contains("pattern = \"queue\""));
}
