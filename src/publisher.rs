//! The publish loop
//!
//! [`Publisher`] owns the configuration, the broker handle, the sequence
//! counter and a [`Shutdown`] handle. [`Publisher::run`] drives it through
//! `starting -> connecting -> publishing -> stopping -> stopped`:
//!
//! - connecting retries up to the configured budget with a fixed delay and
//!   returns a fatal [`PublisherError::Connection`] once the budget is spent
//! - publishing builds a message, dispatches it, sleeps for the interval and
//!   repeats while the running flag holds; failures inside an iteration are
//!   logged and never end the loop
//! - stopping releases the broker exactly once and reports the final count

use crate::broker::{Broker, BrokerError, CHANNEL_NAME, QUEUE_NAME};
use crate::config::{DeliveryMode, PublisherConfig};
use crate::dispatch::{DeliveryFailure, DispatchError, DispatchReceipt, Mechanism};
use crate::error::{PublisherError, PublisherResult};
use crate::message::Message;
use crate::observability::metrics::{MetricsCollector, MetricsSnapshot};
use crate::observability::{connection_span, publish_span};
use crate::shutdown::Shutdown;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument};

/// Lifecycle state of a publisher run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherState {
    Starting,
    Connecting,
    Publishing,
    Stopping,
    Stopped,
}

impl fmt::Display for PublisherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublisherState::Starting => "starting",
            PublisherState::Connecting => "connecting",
            PublisherState::Publishing => "publishing",
            PublisherState::Stopping => "stopping",
            PublisherState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Final report of a graceful run
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    /// Messages built and handed to dispatch, successful or not
    pub messages_sent: u64,
    pub metrics: MetricsSnapshot,
}

/// Periodic message publisher over a [`Broker`]
pub struct Publisher<B: Broker> {
    config: PublisherConfig,
    broker: B,
    shutdown: Shutdown,
    metrics: MetricsCollector,
    count: u64,
    state: PublisherState,
    released: bool,
}

impl<B: Broker> Publisher<B> {
    pub fn new(config: PublisherConfig, broker: B, shutdown: Shutdown) -> Self {
        Self {
            config,
            broker,
            shutdown,
            metrics: MetricsCollector::new(),
            count: 0,
            state: PublisherState::Starting,
            released: false,
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Get the broker instance for testing
    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn state(&self) -> PublisherState {
        self.state
    }

    /// Sequence number of the most recently built message
    pub fn message_count(&self) -> u64 {
        self.count
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Establish the broker connection, retrying on failure
    ///
    /// Waits the configured delay between failed attempts; no wait follows
    /// the last one. A budget of zero is treated as one attempt.
    pub async fn connect(&mut self, max_attempts: u32) -> PublisherResult<()> {
        let max_attempts = max_attempts.max(1);
        let delay = self.config.retry.delay;
        let host = self.config.redis.host.clone();
        let port = self.config.redis.port;

        let mut last_error = BrokerError::NotConnected;
        for attempt in 1..=max_attempts {
            self.metrics.connection_attempt();
            let span = connection_span!(attempt, max_attempts);

            match self.broker.connect().instrument(span).await {
                Ok(()) => {
                    self.metrics.connection_established();
                    info!(%host, port, attempt, "Connected to Redis at {}:{}", host, port);
                    return Ok(());
                }
                Err(e) => {
                    self.metrics.connection_failed();
                    warn!(attempt, max_attempts, error = %e, "Failed to connect to Redis");

                    if attempt < max_attempts {
                        info!(
                            "Connection attempt {}/{} failed. Retrying in {:?}...",
                            attempt, max_attempts, delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = e;
                }
            }
        }

        error!(
            max_attempts,
            "Failed to connect to Redis after {} attempts. Exiting.", max_attempts
        );
        Err(PublisherError::Connection {
            attempts: max_attempts,
            source: last_error,
        })
    }

    /// Build the next message in sequence
    pub fn build_message(&mut self) -> Message {
        self.count += 1;
        self.metrics.message_built();
        Message::new(self.count)
    }

    /// Send `message` through the given mode, or the configured one
    ///
    /// In `both` mode the channel publish runs first and the queue append
    /// runs regardless of its outcome. Any failed operation turns the result
    /// into a [`PublisherError::Dispatch`] carrying what did succeed.
    pub async fn dispatch(
        &mut self,
        message: &Message,
        mode: Option<DeliveryMode>,
    ) -> PublisherResult<DispatchReceipt> {
        let mode = mode.unwrap_or(self.config.publish.pattern);
        let payload = message.to_json()?;

        let mut receipt = DispatchReceipt::default();
        let mut failures = Vec::new();

        if mode.includes_pubsub() {
            match self.broker.publish(CHANNEL_NAME, &payload).await {
                Ok(subscribers) => {
                    self.metrics.channel_published(subscribers);
                    receipt.subscribers = Some(subscribers);
                    info!(
                        count = message.count,
                        subscribers,
                        "Published to channel '{}' ({} subscribers): {}",
                        CHANNEL_NAME,
                        subscribers,
                        message.message
                    );
                }
                Err(error) => {
                    error!(
                        timestamp = %message.timestamp,
                        %mode,
                        error = %error,
                        "Failed to publish message to channel '{}'", CHANNEL_NAME
                    );
                    failures.push(DeliveryFailure {
                        mechanism: Mechanism::Channel,
                        error,
                    });
                }
            }
        }

        if mode.includes_queue() {
            match self.broker.push(QUEUE_NAME, &payload).await {
                Ok(length) => {
                    self.metrics.queue_pushed(length);
                    receipt.queue_length = Some(length);
                    info!(
                        count = message.count,
                        queue_length = length,
                        "Pushed to queue '{}' (length: {}): {}",
                        QUEUE_NAME,
                        length,
                        message.message
                    );
                }
                Err(error) => {
                    error!(
                        timestamp = %message.timestamp,
                        %mode,
                        error = %error,
                        "Failed to push message to queue '{}'", QUEUE_NAME
                    );
                    failures.push(DeliveryFailure {
                        mechanism: Mechanism::Queue,
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(receipt)
        } else {
            self.metrics.dispatch_failed();
            Err(DispatchError {
                mode,
                receipt,
                failures,
            }
            .into())
        }
    }

    /// Run until the shutdown flag flips, then release the broker
    ///
    /// Returns `Err` only when the connection could not be established.
    pub async fn run(&mut self) -> PublisherResult<RunSummary> {
        self.state = PublisherState::Starting;
        info!("Starting Redis publisher...");
        info!(pattern = %self.config.publish.pattern, "Pattern: {}", self.config.publish.pattern);
        let interval = self.config.publish.interval();
        info!(
            interval_secs = interval.as_secs_f64(),
            "Publish interval: {}s",
            interval.as_secs_f64()
        );

        self.transition(PublisherState::Connecting);
        if let Err(e) = self.connect(self.config.retry.max_attempts).await {
            self.close().await;
            self.transition(PublisherState::Stopped);
            return Err(e);
        }

        self.transition(PublisherState::Publishing);

        while self.shutdown.is_running() {
            let span = publish_span!(count = self.count + 1);
            let outcome = self.publish_once().instrument(span).await;
            let pause = self.pause_after(&outcome);
            self.shutdown.sleep(pause).await;
        }

        self.transition(PublisherState::Stopping);
        self.close().await;

        let summary = RunSummary {
            messages_sent: self.count,
            metrics: self.metrics.snapshot(),
        };
        info!(
            total = self.count,
            metrics = ?summary.metrics,
            "Publisher stopped. Total messages sent: {}", self.count
        );
        self.transition(PublisherState::Stopped);
        Ok(summary)
    }

    /// Release the broker connection; later calls do nothing
    pub async fn close(&mut self) {
        if self.released {
            debug!("Broker connection already released");
            return;
        }
        self.released = true;

        if let Err(e) = self.broker.close().await {
            warn!(error = %e, "Error while closing Redis connection");
        }
        self.metrics.connection_closed();
    }

    async fn publish_once(&mut self) -> PublisherResult<DispatchReceipt> {
        let message = self.build_message();
        self.dispatch(&message, None).await
    }

    /// Wait before the next iteration: the interval, or the error pause
    /// after anything other than a dispatch failure
    fn pause_after(&self, outcome: &PublisherResult<DispatchReceipt>) -> Duration {
        match outcome {
            // Dispatch failures are already logged per mechanism
            Ok(_) | Err(PublisherError::Dispatch(_)) => self.config.publish.interval(),
            Err(e) => {
                self.metrics.unexpected_error();
                error!(error = %e, "Unexpected error: {}", e);
                self.config.retry.error_pause
            }
        }
    }

    fn transition(&mut self, next: PublisherState) {
        debug!(from = %self.state, to = %next, "Publisher state change");
        self.state = next;
    }
}
