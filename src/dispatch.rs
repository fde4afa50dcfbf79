//! Dispatch outcome types
//!
//! A dispatch in `both` mode is two independent broker operations with no
//! transaction across them. A [`DispatchError`] therefore carries the half
//! that succeeded alongside every failure.

use crate::broker::BrokerError;
use crate::config::DeliveryMode;
use std::fmt;
use thiserror::Error;

/// One of the two delivery mechanisms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    /// PUBLISH on the `messages` channel
    Channel,
    /// RPUSH onto the `message_queue` list
    Queue,
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mechanism::Channel => f.write_str("channel"),
            Mechanism::Queue => f.write_str("queue"),
        }
    }
}

/// What the broker reported for the operations that succeeded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// Subscriber count from the channel publish
    pub subscribers: Option<u64>,
    /// List length after the queue append
    pub queue_length: Option<u64>,
}

/// A single failed broker operation
#[derive(Debug, Error)]
#[error("{mechanism} delivery failed: {error}")]
pub struct DeliveryFailure {
    pub mechanism: Mechanism,
    #[source]
    pub error: BrokerError,
}

/// At least one delivery of a message failed
#[derive(Debug, Error)]
#[error("{mode} dispatch failed: {}", summarize(.failures))]
pub struct DispatchError {
    pub mode: DeliveryMode,
    /// Operations that did succeed before or after the failure
    pub receipt: DispatchReceipt,
    pub failures: Vec<DeliveryFailure>,
}

impl DispatchError {
    pub fn failed(&self, mechanism: Mechanism) -> bool {
        self.failures.iter().any(|f| f.mechanism == mechanism)
    }

    /// True when one mechanism failed and the other succeeded
    pub fn is_partial(&self) -> bool {
        self.receipt.subscribers.is_some() || self.receipt.queue_length.is_some()
    }
}

fn summarize(failures: &[DeliveryFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_reporting() {
        let error = DispatchError {
            mode: DeliveryMode::Both,
            receipt: DispatchReceipt {
                subscribers: Some(2),
                queue_length: None,
            },
            failures: vec![DeliveryFailure {
                mechanism: Mechanism::Queue,
                error: BrokerError::NotConnected,
            }],
        };

        assert!(error.is_partial());
        assert!(error.failed(Mechanism::Queue));
        assert!(!error.failed(Mechanism::Channel));
        assert_eq!(
            error.to_string(),
            "both dispatch failed: queue delivery failed: Not connected"
        );
    }

    #[test]
    fn test_total_failure_is_not_partial() {
        let error = DispatchError {
            mode: DeliveryMode::Both,
            receipt: DispatchReceipt::default(),
            failures: vec![
                DeliveryFailure {
                    mechanism: Mechanism::Channel,
                    error: BrokerError::NotConnected,
                },
                DeliveryFailure {
                    mechanism: Mechanism::Queue,
                    error: BrokerError::NotConnected,
                },
            ],
        };

        assert!(!error.is_partial());
        assert!(error.to_string().contains("channel delivery failed"));
        assert!(error.to_string().contains("; queue delivery failed"));
    }
}
