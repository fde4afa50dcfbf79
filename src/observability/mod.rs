//! Observability for the publisher: structured logging and run metrics

pub mod logging;
pub mod metrics;

// Re-export for convenience
pub use logging::{init_logging, parse_level, LogFormat};
pub use metrics::{MetricsCollector, MetricsSnapshot};

// Span macros for structured logging
pub use logging::{connection_span, publish_span};
