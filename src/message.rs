//! Wire payload sent to both delivery mechanisms

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender tag carried by every message this process emits
pub const SENDER: &str = "rust-publisher";

/// A single synthetic message
///
/// Built fresh for each loop iteration and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    /// ISO-8601 creation time
    pub timestamp: String,
    pub message: String,
    pub sender: String,
    /// Sequence number, starting at 1
    pub count: u64,
}

impl Message {
    /// Build the message for sequence number `count`
    pub fn new(count: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: timestamp_now(),
            message: format!("Hello from Rust #{count}"),
            sender: SENDER.to_string(),
            count,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Current UTC time as ISO-8601 with microsecond precision
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
