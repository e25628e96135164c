use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Reconnection and liveness settings for a stream client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamClientSettings {
    /// Wait before the first reconnection attempt, and after any success
    pub reconnect_delay_min: Duration,
    /// Upper bound for the reconnection wait
    pub reconnect_delay_max: Duration,
    /// Added to the wait after every failed attempt
    pub reconnect_delay_increment: Duration,
    /// Fault a connected stream that stays silent this long (None = never)
    pub heartbeat_timeout: Option<Duration>,
    /// Give up after this many consecutive attempts (None = unlimited)
    pub max_reconnect_attempts: Option<usize>,
}

impl Default for StreamClientSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_min: Duration::from_secs(5),
            reconnect_delay_max: Duration::from_secs(60),
            reconnect_delay_increment: Duration::from_secs(5),
            heartbeat_timeout: None,
            max_reconnect_attempts: None,
        }
    }
}

impl StreamClientSettings {
    /// Validate delay bounds
    pub fn validate(&self) -> Result<()> {
        if self.reconnect_delay_min > self.reconnect_delay_max {
            return Err(StreamError::Configuration(format!(
                "reconnect_delay_min ({:?}) exceeds reconnect_delay_max ({:?})",
                self.reconnect_delay_min, self.reconnect_delay_max
            )));
        }

        if self.heartbeat_timeout == Some(Duration::ZERO) {
            return Err(StreamError::Configuration(
                "heartbeat_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Backoff policy described by these settings
    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff::new(
            self.reconnect_delay_min,
            self.reconnect_delay_max,
            self.reconnect_delay_increment,
            self.max_reconnect_attempts,
        )
    }
}

/// Everything the actor task needs, assembled by the builder
pub struct ClientConfig<C>
where
    C: FrameCodec,
{
    /// Stream endpoint
    pub(crate) url: String,

    /// Frame codec shared with every connection's reader
    pub(crate) codec: Arc<C>,

    /// Opens the outbound connection
    pub(crate) transport: Arc<dyn Transport>,

    /// Optional header provider, called on every connect
    pub(crate) headers: Option<Arc<dyn HeaderProvider>>,

    /// Reconnection and heartbeat settings
    pub(crate) settings: StreamClientSettings,
}

impl<C> ClientConfig<C>
where
    C: FrameCodec,
{
    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn settings(&self) -> &StreamClientSettings {
        &self.settings
    }

    /// Check if a header provider is configured
    pub fn has_headers(&self) -> bool {
        self.headers.is_some()
    }
}
