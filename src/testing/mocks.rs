//! Mock broker for testing
//!
//! [`MockBroker`] records every operation in call order and can be scripted to
//! fail connection attempts or either delivery mechanism. Clones share the
//! recorded history, so a test can keep a handle after moving the broker into
//! a publisher.

use crate::broker::{Broker, BrokerError};
use crate::shutdown::Shutdown;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One recorded broker call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerOp {
    Connect { attempt: u32, ok: bool },
    /// `subscribers` is `None` when the publish failed
    Publish {
        channel: String,
        payload: String,
        subscribers: Option<u64>,
    },
    /// `length` is `None` when the push failed
    Push {
        list: String,
        payload: String,
        length: Option<u64>,
    },
    Close,
}

/// Scripted in-memory broker
#[derive(Debug, Default, Clone)]
pub struct MockBroker {
    pub operations: Arc<Mutex<Vec<BrokerOp>>>,
    pub lists: Arc<Mutex<HashMap<String, Vec<String>>>>,
    /// Subscriber count reported by every publish
    pub subscribers: u64,
    /// Number of leading connection attempts that fail
    pub connect_failures: u32,
    pub fail_publish: bool,
    pub fail_push: bool,
    connect_calls: u32,
    connected: bool,
    stop_after: Option<(usize, Shutdown)>,
    delivery_calls: usize,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` connection attempts, then succeed
    pub fn failing_connects(n: u32) -> Self {
        Self {
            connect_failures: n,
            ..Default::default()
        }
    }

    /// Never accept a connection
    pub fn unreachable() -> Self {
        Self::failing_connects(u32::MAX)
    }

    pub fn with_subscribers(mut self, subscribers: u64) -> Self {
        self.subscribers = subscribers;
        self
    }

    pub fn with_publish_failure(mut self) -> Self {
        self.fail_publish = true;
        self
    }

    pub fn with_push_failure(mut self) -> Self {
        self.fail_push = true;
        self
    }

    /// Trigger `shutdown` once `calls` publish/push calls have been made
    pub fn stop_after(mut self, calls: usize, shutdown: Shutdown) -> Self {
        self.stop_after = Some((calls, shutdown));
        self
    }

    pub async fn get_operations(&self) -> Vec<BrokerOp> {
        self.operations.lock().await.clone()
    }

    pub async fn connect_attempts(&self) -> usize {
        self.count_ops(|op| matches!(op, BrokerOp::Connect { .. }))
            .await
    }

    pub async fn close_count(&self) -> usize {
        self.count_ops(|op| matches!(op, BrokerOp::Close)).await
    }

    /// Published `(channel, payload)` pairs, including failed attempts
    pub async fn get_publishes(&self) -> Vec<(String, String)> {
        self.operations
            .lock()
            .await
            .iter()
            .filter_map(|op| match op {
                BrokerOp::Publish {
                    channel, payload, ..
                } => Some((channel.clone(), payload.clone())),
                _ => None,
            })
            .collect()
    }

    /// Pushed `(list, payload)` pairs, including failed attempts
    pub async fn get_pushes(&self) -> Vec<(String, String)> {
        self.operations
            .lock()
            .await
            .iter()
            .filter_map(|op| match op {
                BrokerOp::Push { list, payload, .. } => Some((list.clone(), payload.clone())),
                _ => None,
            })
            .collect()
    }

    /// Lengths reported by successful pushes, in call order
    pub async fn get_queue_lengths(&self) -> Vec<u64> {
        self.operations
            .lock()
            .await
            .iter()
            .filter_map(|op| match op {
                BrokerOp::Push { length, .. } => *length,
                _ => None,
            })
            .collect()
    }

    pub async fn get_list(&self, list: &str) -> Vec<String> {
        self.lists
            .lock()
            .await
            .get(list)
            .cloned()
            .unwrap_or_default()
    }

    async fn count_ops<F>(&self, predicate: F) -> usize
    where
        F: Fn(&BrokerOp) -> bool,
    {
        self.operations
            .lock()
            .await
            .iter()
            .filter(|op| predicate(op))
            .count()
    }

    fn record_delivery_call(&mut self) {
        self.delivery_calls += 1;
        if let Some((limit, shutdown)) = &self.stop_after {
            if self.delivery_calls >= *limit {
                shutdown.trigger("mock stop");
            }
        }
    }
}

#[async_trait]
impl Broker for MockBroker {
    async fn connect(&mut self) -> Result<(), BrokerError> {
        self.connect_calls += 1;
        let ok = self.connect_calls > self.connect_failures;

        self.operations.lock().await.push(BrokerOp::Connect {
            attempt: self.connect_calls,
            ok,
        });

        if ok {
            self.connected = true;
            Ok(())
        } else {
            Err(BrokerError::ConnectionFailed(
                "Mock connection refused".into(),
            ))
        }
    }

    async fn publish(&mut self, channel: &str, payload: &str) -> Result<u64, BrokerError> {
        let result = if !self.connected {
            Err(BrokerError::NotConnected)
        } else if self.fail_publish {
            Err(BrokerError::command_failed(
                "PUBLISH",
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "Mock publish failure"),
            ))
        } else {
            Ok(self.subscribers)
        };

        self.operations.lock().await.push(BrokerOp::Publish {
            channel: channel.to_string(),
            payload: payload.to_string(),
            subscribers: result.as_ref().ok().copied(),
        });
        self.record_delivery_call();
        result
    }

    async fn push(&mut self, list: &str, payload: &str) -> Result<u64, BrokerError> {
        let result = if !self.connected {
            Err(BrokerError::NotConnected)
        } else if self.fail_push {
            Err(BrokerError::command_failed(
                "RPUSH",
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "Mock push failure"),
            ))
        } else {
            let mut lists = self.lists.lock().await;
            let entries = lists.entry(list.to_string()).or_default();
            entries.push(payload.to_string());
            Ok(entries.len() as u64)
        };

        self.operations.lock().await.push(BrokerOp::Push {
            list: list.to_string(),
            payload: payload.to_string(),
            length: result.as_ref().ok().copied(),
        });
        self.record_delivery_call();
        result
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        self.connected = false;
        self.operations.lock().await.push(BrokerOp::Close);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
