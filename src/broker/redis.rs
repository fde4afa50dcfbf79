//! Redis implementation of [`Broker`]
//!
//! Uses a multiplexed async connection from the `redis` crate. Every network
//! operation is bounded by a timeout so an unreachable host fails fast instead
//! of hanging the publish loop.

use super::{Broker, BrokerError};
use crate::config::{RedisSection, RetryPolicy};
use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Client};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Broker client backed by a Redis server
pub struct RedisBroker {
    client: Client,
    address: String,
    connection: Option<MultiplexedConnection>,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl RedisBroker {
    /// Create a client for `redis`; no network I/O happens until [`Broker::connect`]
    pub fn new(redis: &RedisSection, retry: &RetryPolicy) -> Result<Self, BrokerError> {
        let client =
            Client::open(redis.url()).map_err(|e| BrokerError::ConnectionFailed(Box::new(e)))?;

        Ok(Self {
            client,
            address: format!("{}:{}", redis.host, redis.port),
            connection: None,
            connect_timeout: retry.connect_timeout,
            command_timeout: retry.command_timeout,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn connection(&mut self) -> Result<&mut MultiplexedConnection, BrokerError> {
        self.connection.as_mut().ok_or(BrokerError::NotConnected)
    }
}

/// Run a redis command future under `after`, mapping both failure kinds
async fn bounded<T, F>(command: &'static str, after: Duration, fut: F) -> Result<T, BrokerError>
where
    F: Future<Output = ::redis::RedisResult<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(BrokerError::command_failed(command, e)),
        Err(_) => Err(BrokerError::Timeout {
            operation: command,
            after,
        }),
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn connect(&mut self) -> Result<(), BrokerError> {
        // One bound covers both the handshake and the liveness check
        let client = &self.client;
        let attempt = async {
            let mut connection = client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| BrokerError::ConnectionFailed(Box::new(e)))?;
            let pong: String = ::redis::cmd("PING")
                .query_async(&mut connection)
                .await
                .map_err(|e| BrokerError::command_failed("PING", e))?;
            Ok::<_, BrokerError>((connection, pong))
        };

        let (connection, pong) = tokio::time::timeout(self.connect_timeout, attempt)
            .await
            .map_err(|_| BrokerError::Timeout {
                operation: "connect",
                after: self.connect_timeout,
            })??;
        debug!(address = %self.address, reply = %pong, "Liveness check passed");

        self.connection = Some(connection);
        Ok(())
    }

    async fn publish(&mut self, channel: &str, payload: &str) -> Result<u64, BrokerError> {
        let after = self.command_timeout;
        let connection = self.connection()?;
        bounded("PUBLISH", after, connection.publish(channel, payload)).await
    }

    async fn push(&mut self, list: &str, payload: &str) -> Result<u64, BrokerError> {
        let after = self.command_timeout;
        let connection = self.connection()?;
        bounded("RPUSH", after, connection.rpush(list, payload)).await
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        // Dropping the last handle tears down the multiplexed connection
        if self.connection.take().is_some() {
            info!(address = %self.address, "Closed Redis connection");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}
