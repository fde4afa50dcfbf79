//! Broker abstraction consumed by the publisher
//!
//! The [`Broker`] trait is the seam between the publish loop and the actual
//! broker client, so the loop can be driven against [`redis::RedisBroker`] in
//! production and a scripted stub in tests.

use std::time::Duration;
use thiserror::Error;

pub mod redis;

pub use self::redis::RedisBroker;

/// Well-known publish/subscribe channel
pub const CHANNEL_NAME: &str = "messages";

/// Well-known durable list
pub const QUEUE_NAME: &str = "message_queue";

/// Broker communication errors
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Connection failed")]
    ConnectionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("Not connected")]
    NotConnected,
    #[error("{command} failed")]
    CommandFailed {
        command: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BrokerError {
    pub fn command_failed<E>(command: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::CommandFailed {
            command,
            source: Box::new(source),
        }
    }
}

/// Operations the publisher needs from a broker connection
#[async_trait::async_trait]
pub trait Broker: Send {
    /// Open a connection and verify it with a liveness round-trip
    async fn connect(&mut self) -> Result<(), BrokerError>;

    /// Publish `payload` on `channel`, returning the subscriber count
    async fn publish(&mut self, channel: &str, payload: &str) -> Result<u64, BrokerError>;

    /// Append `payload` to the tail of `list`, returning the new length
    async fn push(&mut self, list: &str, payload: &str) -> Result<u64, BrokerError>;

    /// Release the connection; calling it again is a no-op
    async fn close(&mut self) -> Result<(), BrokerError>;

    fn is_connected(&self) -> bool;
}
