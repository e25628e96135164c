pub mod states;

use crate::client::StreamClient;
use crate::config::{ClientConfig, StreamClientSettings};
use crate::transport::HttpTransport;
use crate::traits::*;
use states::*;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for StreamClient
///
/// This builder uses Rust's type system to enforce that required
/// fields (URL and codec) are set before the client can be built.
/// Everything else has a default: an [`HttpTransport`], no extra
/// headers and [`StreamClientSettings::default`].
pub struct StreamClientBuilder<U, K, C>
where
    U: UrlState,
    K: CodecState,
{
    _state: TypeState<U, K>,
    url: Option<String>,
    codec: Option<C>,
    transport: Option<Arc<dyn Transport>>,
    headers: Option<Arc<dyn HeaderProvider>>,
    settings: StreamClientSettings,
}

impl StreamClientBuilder<NoUrl, NoCodec, ()> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            url: None,
            codec: None,
            transport: None,
            headers: None,
            settings: StreamClientSettings::default(),
        }
    }
}

impl Default for StreamClientBuilder<NoUrl, NoCodec, ()> {
    fn default() -> Self {
        Self::new()
    }
}

// URL setting
impl<K, C> StreamClientBuilder<NoUrl, K, C>
where
    K: CodecState,
{
    pub fn url(self, url: impl Into<String>) -> StreamClientBuilder<HasUrl, K, C> {
        StreamClientBuilder {
            _state: TypeState::new(),
            url: Some(url.into()),
            codec: self.codec,
            transport: self.transport,
            headers: self.headers,
            settings: self.settings,
        }
    }
}

// Codec setting
impl<U> StreamClientBuilder<U, NoCodec, ()>
where
    U: UrlState,
{
    pub fn codec<NewC>(self, codec: NewC) -> StreamClientBuilder<U, HasCodec, NewC>
    where
        NewC: FrameCodec,
    {
        StreamClientBuilder {
            _state: TypeState::new(),
            url: self.url,
            codec: Some(codec),
            transport: self.transport,
            headers: self.headers,
            settings: self.settings,
        }
    }
}

// Optional configuration methods
impl<U, K, C> StreamClientBuilder<U, K, C>
where
    U: UrlState,
    K: CodecState,
{
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Share one transport between several clients
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn headers(mut self, provider: impl HeaderProvider + 'static) -> Self {
        self.headers = Some(Arc::new(provider));
        self
    }

    pub fn settings(mut self, settings: StreamClientSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the linear backoff bounds
    ///
    /// # Arguments
    /// * `min` - First wait, and the wait after any successful connection
    /// * `max` - Upper bound for the wait
    /// * `increment` - Added after every failed attempt
    pub fn reconnect_delays(mut self, min: Duration, max: Duration, increment: Duration) -> Self {
        self.settings.reconnect_delay_min = min;
        self.settings.reconnect_delay_max = max;
        self.settings.reconnect_delay_increment = increment;
        self
    }

    /// Fault the connection when nothing arrives for `timeout`
    ///
    /// Recommended value: a little over twice the server's heartbeat interval.
    pub fn heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.settings.heartbeat_timeout = Some(timeout);
        self
    }

    pub fn max_reconnect_attempts(mut self, attempts: usize) -> Self {
        self.settings.max_reconnect_attempts = Some(attempts);
        self
    }
}

// Build method - only available when all required fields are set
impl<C> StreamClientBuilder<HasUrl, HasCodec, C>
where
    C: FrameCodec,
{
    /// Spawn the client's actor task
    ///
    /// Must be called from within a tokio runtime. The client starts
    /// `Disconnected`; call `connect()` to open the stream.
    pub fn build(self) -> Result<StreamClient<C>> {
        let (Some(url), Some(codec)) = (self.url, self.codec) else {
            return Err(StreamError::Configuration(
                "url and codec must be set".to_string(),
            ));
        };

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::default()));

        let config = ClientConfig {
            url,
            codec: Arc::new(codec),
            transport,
            headers: self.headers,
            settings: self.settings,
        };

        StreamClient::new(config)
    }
}
