//! Publisher metrics
//!
//! Atomic counters owned by one publisher. A [`MetricsSnapshot`] is taken at
//! shutdown and logged alongside the final message count.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Thread-safe metrics collector using atomics
#[derive(Debug)]
pub struct MetricsCollector {
    // Connection metrics
    redis_connected: AtomicBool,
    connection_attempts: AtomicU64,
    connection_failures: AtomicU64,
    connected_at: AtomicU64,

    // Delivery metrics
    messages_built: AtomicU64,
    channel_publishes: AtomicU64,
    queue_pushes: AtomicU64,
    dispatch_failures: AtomicU64,
    unexpected_errors: AtomicU64,
    last_subscribers: AtomicU64,
    last_queue_length: AtomicU64,

    started_at: AtomicU64,
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub redis_connected: bool,
    pub connection_attempts: u64,
    pub connection_failures: u64,
    pub messages_built: u64,
    pub channel_publishes: u64,
    pub queue_pushes: u64,
    pub dispatch_failures: u64,
    pub unexpected_errors: u64,
    pub last_subscribers: u64,
    pub last_queue_length: u64,
    pub connected_secs: u64,
    pub uptime_secs: u64,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            redis_connected: AtomicBool::new(false),
            connection_attempts: AtomicU64::new(0),
            connection_failures: AtomicU64::new(0),
            connected_at: AtomicU64::new(0),
            messages_built: AtomicU64::new(0),
            channel_publishes: AtomicU64::new(0),
            queue_pushes: AtomicU64::new(0),
            dispatch_failures: AtomicU64::new(0),
            unexpected_errors: AtomicU64::new(0),
            last_subscribers: AtomicU64::new(0),
            last_queue_length: AtomicU64::new(0),
            started_at: AtomicU64::new(current_timestamp()),
        }
    }

    // Connection metrics
    pub fn connection_attempt(&self) {
        self.connection_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_established(&self) {
        self.redis_connected.store(true, Ordering::Relaxed);
        self.connected_at
            .store(current_timestamp(), Ordering::Relaxed);
    }

    pub fn connection_failed(&self) {
        self.connection_failures.fetch_add(1, Ordering::Relaxed);
        self.redis_connected.store(false, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.redis_connected.store(false, Ordering::Relaxed);
    }

    // Delivery metrics
    pub fn message_built(&self) {
        self.messages_built.fetch_add(1, Ordering::Relaxed);
    }

    pub fn channel_published(&self, subscribers: u64) {
        self.channel_publishes.fetch_add(1, Ordering::Relaxed);
        self.last_subscribers.store(subscribers, Ordering::Relaxed);
    }

    pub fn queue_pushed(&self, length: u64) {
        self.queue_pushes.fetch_add(1, Ordering::Relaxed);
        self.last_queue_length.store(length, Ordering::Relaxed);
    }

    pub fn dispatch_failed(&self) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unexpected_error(&self) {
        self.unexpected_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let connected = self.redis_connected.load(Ordering::Relaxed);
        let connected_at = self.connected_at.load(Ordering::Relaxed);

        MetricsSnapshot {
            redis_connected: connected,
            connection_attempts: self.connection_attempts.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
            messages_built: self.messages_built.load(Ordering::Relaxed),
            channel_publishes: self.channel_publishes.load(Ordering::Relaxed),
            queue_pushes: self.queue_pushes.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            unexpected_errors: self.unexpected_errors.load(Ordering::Relaxed),
            last_subscribers: self.last_subscribers.load(Ordering::Relaxed),
            last_queue_length: self.last_queue_length.load(Ordering::Relaxed),
            connected_secs: if connected && connected_at > 0 {
                now.saturating_sub(connected_at)
            } else {
                0
            },
            uptime_secs: now.saturating_sub(self.started_at.load(Ordering::Relaxed)),
        }
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
