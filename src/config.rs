//! Publisher configuration
//!
//! Configuration is a one-time snapshot of the process environment taken at
//! startup. Nothing here re-reads the environment once a [`PublisherConfig`]
//! has been built.
//!
//! | Variable           | Default     |
//! |--------------------|-------------|
//! | `REDIS_HOST`       | `localhost` |
//! | `REDIS_PORT`       | `6379`      |
//! | `PUBLISH_INTERVAL` | `2.0`       |
//! | `PATTERN`          | `both`      |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const REDIS_HOST_ENV: &str = "REDIS_HOST";
pub const REDIS_PORT_ENV: &str = "REDIS_PORT";
pub const PUBLISH_INTERVAL_ENV: &str = "PUBLISH_INTERVAL";
pub const PATTERN_ENV: &str = "PATTERN";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 6379;
const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Complete publisher configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublisherConfig {
    pub redis: RedisSection,
    pub publish: PublishSection,
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Broker location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedisSection {
    pub host: String,
    pub port: u16,
}

impl RedisSection {
    /// Connection URL understood by the redis client
    pub fn url(&self) -> String {
        if self.host.contains(':') {
            format!("redis://[{}]:{}/", self.host, self.port)
        } else {
            format!("redis://{}:{}/", self.host, self.port)
        }
    }
}

/// Publishing schedule and delivery mode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishSection {
    /// Delay between messages
    #[serde(rename = "interval_secs", with = "duration_secs")]
    pub interval: Duration,
    pub pattern: DeliveryMode,
}

impl PublishSection {
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Which delivery mechanism(s) a message goes through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Fan-out publish on the `messages` channel
    PubSub,
    /// Append to the `message_queue` list
    Queue,
    /// Publish, then append
    #[default]
    Both,
}

impl DeliveryMode {
    pub fn includes_pubsub(self) -> bool {
        matches!(self, DeliveryMode::PubSub | DeliveryMode::Both)
    }

    pub fn includes_queue(self) -> bool {
        matches!(self, DeliveryMode::Queue | DeliveryMode::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMode::PubSub => "pubsub",
            DeliveryMode::Queue => "queue",
            DeliveryMode::Both => "both",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pubsub" => Ok(DeliveryMode::PubSub),
            "queue" => Ok(DeliveryMode::Queue),
            "both" => Ok(DeliveryMode::Both),
            other => Err(ConfigError::InvalidPattern(other.to_string())),
        }
    }
}

/// Connection retry budget and fixed delays
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Connection attempts before giving up
    pub max_attempts: u32,
    /// Wait between failed connection attempts
    #[serde(with = "duration_secs")]
    pub delay: Duration,
    /// Bound on one connection attempt, liveness check included
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
    /// Bound on a single command (PUBLISH, RPUSH)
    #[serde(with = "duration_secs")]
    pub command_timeout: Duration,
    /// Pause after an unexpected error inside the publish loop
    #[serde(with = "duration_secs")]
    pub error_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
            error_pause: Duration::from_secs(1),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Configuration loading errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid REDIS_PORT value: {0}")]
    InvalidPort(String),
    #[error("Invalid PUBLISH_INTERVAL value: {0}")]
    InvalidInterval(String),
    #[error("Invalid REDIS_HOST value: {0}")]
    InvalidHost(String),
    #[error("Invalid PATTERN value '{0}', expected one of pubsub, queue, both")]
    InvalidPattern(String),
}

impl PublisherConfig {
    /// Snapshot the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let host = lookup(REDIS_HOST_ENV).unwrap_or(defaults.redis.host);

        let port = match lookup(REDIS_PORT_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => defaults.redis.port,
        };

        let interval = match lookup(PUBLISH_INTERVAL_ENV) {
            Some(raw) => parse_interval(&raw)?,
            None => defaults.publish.interval,
        };

        let pattern = match lookup(PATTERN_ENV) {
            Some(raw) => raw.parse()?,
            None => defaults.publish.pattern,
        };

        Ok(Self {
            redis: RedisSection { host, port },
            publish: PublishSection { interval, pattern },
            retry: defaults.retry,
        })
    }

    /// Render as TOML for `config --show`
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            redis: RedisSection {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
            },
            publish: PublishSection {
                interval: DEFAULT_INTERVAL,
                pattern: DeliveryMode::default(),
            },
            retry: RetryPolicy::default(),
        }
    }
}

/// Parse seconds into a `Duration`, rejecting anything it cannot hold
fn parse_interval(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| ConfigError::InvalidInterval(raw.to_string()))
}
