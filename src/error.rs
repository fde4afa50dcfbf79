//! Error types for the publisher
//!
//! Only startup failures are fatal. Everything that goes wrong inside the
//! publish loop is logged and the loop carries on.

use crate::broker::BrokerError;
use crate::config::ConfigError;
use crate::dispatch::DispatchError;
use thiserror::Error;

/// Main error type for publisher operations
#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("Failed to connect to Redis after {attempts} attempts")]
    Connection {
        attempts: u32,
        #[source]
        source: BrokerError,
    },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

impl PublisherError {
    /// Whether the process should terminate
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PublisherError::Connection { .. } | PublisherError::Config(_) | PublisherError::Signal(_)
        )
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() {
            1
        } else {
            0
        }
    }
}

/// Result type for publisher operations
pub type PublisherResult<T> = Result<T, PublisherError>;
