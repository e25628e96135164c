//! Logging setup, Ctrl+C handling and the start/stop banners shared by
//! the binaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

/// Display name and status cadence of a binary
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub name: String,
    pub status_interval_secs: u64,
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status_interval_secs: 300,
        }
    }

    pub fn with_status_interval(mut self, secs: u64) -> Self {
        self.status_interval_secs = secs;
        self
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }
}

/// Initialize tracing, honouring `RUST_LOG` and falling back to `default_level`
pub fn init_logging(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .init();
}

/// Running flag cleared by Ctrl+C
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Create a new signal in running state
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Spawn a Ctrl+C handler that triggers shutdown
    pub fn spawn_signal_handler(&self) {
        let flag = Arc::clone(&self.flag);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("");
                info!("Received shutdown signal (Ctrl+C)");
                info!("Shutting down gracefully...");
                flag.store(false, Ordering::Release);
            }
        });
    }

    /// Check if the process should continue running
    pub fn is_running(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Trigger shutdown without a signal
    pub fn trigger(&self) {
        self.flag.store(false, Ordering::Release);
    }

    /// Sleep for a duration, but wake early if shutdown is triggered
    pub async fn interruptible_sleep(&self, duration: Duration) {
        let check_interval = Duration::from_millis(50);
        let mut elapsed = Duration::ZERO;

        while elapsed < duration && self.is_running() {
            tokio::time::sleep(check_interval).await;
            elapsed += check_interval;
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// A long-running binary with start and stop banners
pub trait BinaryRunner {
    /// Main loop; returns once shutdown is requested
    async fn run(&mut self) -> anyhow::Result<()>;

    fn config(&self) -> &RunConfig;

    /// One-line summary logged in the stop banner
    fn summary(&self) -> Option<String> {
        None
    }

    fn print_banner(&self) {
        let config = self.config();
        info!("");
        info!("========================================");
        info!("{} starting", config.name);
        info!("Status every {}s, Ctrl+C to stop", config.status_interval_secs);
        info!("========================================");
        info!("");
    }

    fn print_shutdown(&self) {
        info!("");
        info!("========================================");
        info!("{} stopped", self.config().name);
        if let Some(summary) = self.summary() {
            info!("{}", summary);
        }
        info!("========================================");
    }

    /// Run between the two banners
    async fn execute(&mut self) -> anyhow::Result<()> {
        self.print_banner();
        let outcome = self.run().await;
        if let Err(e) = &outcome {
            tracing::error!("{} failed: {:#}", self.config().name, e);
        }
        self.print_shutdown();
        outcome
    }
}
