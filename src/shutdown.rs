//! Cooperative shutdown flag
//!
//! The running flag is a lock-free [`AtomicBool`] that starts `true` and is
//! flipped to `false` at most once. Sleepers in the publish loop also register
//! on a [`Notify`] so a pending interval wakes as soon as the flag flips; the
//! loop itself only acts on the flag at the top of an iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info};

/// Cloneable handle to the process-wide running flag
#[derive(Debug, Clone)]
pub struct Shutdown {
    running: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Flip the flag to stopped
    ///
    /// Every call logs its receipt but only the first flips the flag, and
    /// only that one returns `true`. Safe to call from a signal-handling task
    /// since it performs no I/O beyond a log line.
    pub fn trigger(&self, reason: &str) -> bool {
        let flipped = self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if flipped {
            info!(reason = %reason, "Received {}. Shutting down gracefully...", reason);
            self.notify.notify_waiters();
        } else {
            debug!(reason = %reason, "Received {} while already shutting down", reason);
        }

        flipped
    }

    /// Sleep for `duration`, returning early if shutdown is triggered
    pub async fn sleep(&self, duration: Duration) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a trigger in between is not lost
        notified.as_mut().enable();

        if !self.is_running() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = notified => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_starts_running() {
        assert!(Shutdown::new().is_running());
    }

    #[test]
    fn test_trigger_flips_once() {
        let shutdown = Shutdown::new();
        let clone = shutdown.clone();

        assert!(clone.trigger("SIGINT"));
        assert!(!shutdown.is_running());

        // Never reverts and a second signal is not a second transition
        assert!(!shutdown.trigger("SIGTERM"));
        assert!(!shutdown.is_running());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_every_signal_is_logged() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let shutdown = Shutdown::new();
        tracing::subscriber::with_default(subscriber, || {
            assert!(shutdown.trigger("SIGINT"));
            assert!(!shutdown.trigger("SIGTERM"));
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Received SIGINT. Shutting down gracefully..."));
        assert!(output.contains("Received SIGTERM while already shutting down"));
        assert!(!shutdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_runs_full_duration_when_running() {
        let shutdown = Shutdown::new();
        let start = Instant::now();

        shutdown.sleep(Duration::from_secs(2)).await;

        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_wakes_on_trigger() {
        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();
        let start = Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.trigger("SIGTERM");
        });

        shutdown.sleep(Duration::from_secs(60)).await;

        assert!(start.elapsed() < Duration::from_secs(60));
        assert!(!shutdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_returns_immediately_after_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger("SIGINT");
        let start = Instant::now();

        shutdown.sleep(Duration::from_secs(60)).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
