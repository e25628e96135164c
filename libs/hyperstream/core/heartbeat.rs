//! Heartbeat watchdog for stream connections
//!
//! # Architecture
//!
//! The server writes a heartbeat frame at a fixed interval. The watchdog is
//! a deadline owned by the actor task that every received chunk pushes back:
//!
//! ```text
//! chunk ──> feed() ──> deadline = now + timeout
//!                            │
//!            actor select! ──┴──> expired() fires ──> HeartbeatTimeout ──> Faulted
//! ```
//!
//! A disarmed watchdog (no timeout configured, or no live connection)
//! never fires.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Deadline-based liveness check for one connection
#[derive(Debug, Clone)]
pub struct HeartbeatWatchdog {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl HeartbeatWatchdog {
    /// # Arguments
    /// * `timeout` - Silence allowed before the connection is considered dead (None = disabled)
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Start (or restart) the countdown
    pub fn feed(&mut self) {
        if let Some(timeout) = self.timeout {
            self.deadline = Some(Instant::now() + timeout);
        }
    }

    /// Stop the countdown until the next `feed`
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolve once the deadline passes, yielding the configured timeout
    pub async fn expired(&self) -> Duration {
        match (self.deadline, self.timeout) {
            (Some(deadline), Some(timeout)) => {
                tokio::time::sleep_until(deadline).await;
                debug!("Heartbeat watchdog expired after {:?}", timeout);
                timeout
            }
            _ => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_timeout() {
        let mut watchdog = HeartbeatWatchdog::new(Some(Duration::from_secs(30)));
        watchdog.feed();
        assert!(watchdog.is_armed());

        let start = Instant::now();
        let timeout = watchdog.expired().await;
        assert_eq!(timeout, Duration::from_secs(30));
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_pushes_deadline_back() {
        let mut watchdog = HeartbeatWatchdog::new(Some(Duration::from_secs(10)));
        watchdog.feed();
        tokio::time::sleep(Duration::from_secs(8)).await;
        watchdog.feed();

        let fired = tokio::time::timeout(Duration::from_secs(5), watchdog.expired()).await;
        assert!(fired.is_err(), "deadline should have moved 10s past the second feed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_never_fires() {
        let mut watchdog = HeartbeatWatchdog::new(None);
        watchdog.feed();
        assert!(!watchdog.is_armed());

        let fired = tokio::time::timeout(Duration::from_secs(3600), watchdog.expired()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_never_fires() {
        let mut watchdog = HeartbeatWatchdog::new(Some(Duration::from_secs(1)));
        watchdog.feed();
        watchdog.disarm();

        let fired = tokio::time::timeout(Duration::from_secs(10), watchdog.expired()).await;
        assert!(fired.is_err());
    }
}
