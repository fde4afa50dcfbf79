//! Redis Publisher
//!
//! A periodic message generator that publishes synthetic payloads to Redis
//! through a publish/subscribe channel, a durable list, or both.
//!
//! # Overview
//!
//! - Configuration snapshot from the environment ([`config`])
//! - Broker abstraction and the Redis client ([`broker`])
//! - The publish loop with connection retry and graceful shutdown ([`publisher`])
//! - Structured logging and run metrics ([`observability`])
//!
//! # Quick Start
//!
//! ```rust
//! use redis_publisher::testing::mocks::MockBroker;
//! use redis_publisher::{DeliveryMode, Publisher, PublisherConfig, Shutdown};
//!
//! # tokio_test::block_on(async {
//! let mut config = PublisherConfig::default();
//! config.publish.pattern = DeliveryMode::Queue;
//!
//! let mut publisher = Publisher::new(config, MockBroker::new(), Shutdown::new());
//! publisher.connect(1).await?;
//!
//! let message = publisher.build_message();
//! let receipt = publisher.dispatch(&message, None).await?;
//! assert_eq!(receipt.queue_length, Some(1));
//! assert_eq!(receipt.subscribers, None);
//! # Ok::<(), redis_publisher::PublisherError>(())
//! # });
//! ```

pub mod broker;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod observability;
pub mod publisher;
pub mod shutdown;
pub mod testing;

pub use broker::{Broker, BrokerError, RedisBroker, CHANNEL_NAME, QUEUE_NAME};
pub use config::{ConfigError, DeliveryMode, PublisherConfig, RetryPolicy};
pub use dispatch::{DeliveryFailure, DispatchError, DispatchReceipt, Mechanism};
pub use error::{PublisherError, PublisherResult};
pub use message::Message;
pub use publisher::{Publisher, PublisherState, RunSummary};
pub use shutdown::Shutdown;
