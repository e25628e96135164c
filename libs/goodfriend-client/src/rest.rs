use crate::config::ClientConfig;
use crate::rate_limit::RateLimitClock;
use crate::requests::*;
use crate::types::*;
use async_trait::async_trait;
use futures::StreamExt;
use hyperstream::transport::to_header_map;
use hyperstream::{
    BinaryCodec, ByteStream, Headers, SessionHeaders, StreamClient, StreamClientSettings,
    StreamError, TextCodec, Transport,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Product token sent in `User-Agent`
pub const CLIENT_NAME: &str = "GoodFriend";

/// Header carrying the optional client key
pub const CLIENT_KEY_HEADER: &str = "Authorization";

/// Default timeout for one-shot requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub type PlayerEventStream = StreamClient<BinaryCodec<PlayerEventStreamUpdate>>;
pub type AnnouncementStream = StreamClient<TextCodec<AnnouncementStreamUpdate>>;

/// Stream transport that honours the shared rate-limit clock
///
/// While a hold is active the open waits it out before touching the
/// network; a 429 answer starts a new hold and fails the attempt.
#[derive(Debug, Clone)]
pub struct ApiTransport {
    client: Client,
    rate_limit: Arc<RateLimitClock>,
}

impl ApiTransport {
    pub fn new(client: Client, rate_limit: Arc<RateLimitClock>) -> Self {
        Self { client, rate_limit }
    }
}

#[async_trait]
impl Transport for ApiTransport {
    async fn open(&self, url: &str, headers: &Headers) -> hyperstream::Result<ByteStream> {
        if let Some(remaining) = self.rate_limit.remaining() {
            info!("Not connecting to {} until rate limit resets in {:?}", url, remaining);
            tokio::time::sleep(remaining).await;
        }

        let response = self
            .client
            .get(url)
            .headers(to_header_map(headers))
            .send()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        let status = response.status();
        self.rate_limit.observe(status, response.headers());
        if !status.is_success() {
            return Err(StreamError::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamError::Transport(e.to_string())));
        Ok(Box::pin(body))
    }
}

/// Client for the GoodFriend API
///
/// One-shot requests are sent once and never retried. Streams are
/// [`StreamClient`]s sharing this client's identification headers and
/// rate-limit clock.
pub struct ApiClient {
    base_url: Url,
    client: Client,
    stream_http: Client,
    session: SessionHeaders,
    rate_limit: Arc<RateLimitClock>,
}

impl ApiClient {
    /// Create new API client
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://api.example.com/`
    /// * `client_key` - Optional key sent in the `Authorization` header
    /// * `request_timeout` - Total timeout for one-shot requests (streams have none)
    pub fn new(base_url: &str, client_key: Option<&str>, request_timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;

        let mut session = SessionHeaders::new(CLIENT_NAME, env!("CARGO_PKG_VERSION"));
        if let Some(key) = client_key.filter(|key| !key.is_empty()) {
            session = session.with_header(CLIENT_KEY_HEADER, key);
        }
        let default_headers = to_header_map(&session.to_headers());

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(request_timeout)
            .build()?;

        // Streams are long-lived, so only the connect phase is bounded
        let stream_http = Client::builder().connect_timeout(request_timeout).build()?;

        info!(
            "API client configured for {} ({}, timeout {:?})",
            base_url,
            session.user_agent(),
            request_timeout
        );

        Ok(Self {
            base_url,
            client,
            stream_http,
            session,
            rate_limit: Arc::new(RateLimitClock::new()),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            &config.api_base_url,
            config.client_key.as_deref(),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session_headers(&self) -> &SessionHeaders {
        &self.session
    }

    /// Clock shared by every request and stream made through this client
    pub fn rate_limit(&self) -> &Arc<RateLimitClock> {
        &self.rate_limit
    }

    /// Absolute URL for an endpoint path
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RequestError::InvalidUrl(format!("{}: {}", path, e)))
    }

    fn check_rate_limit(&self) -> Result<()> {
        match self.rate_limit.remaining() {
            Some(retry_after) => Err(RequestError::RateLimited { retry_after }),
            None => Ok(()),
        }
    }

    fn check_response(&self, response: &reqwest::Response) -> Result<()> {
        let status = response.status();
        if let Some(retry_after) = self.rate_limit.observe(status, response.headers()) {
            return Err(RequestError::RateLimited { retry_after });
        }
        if !status.is_success() {
            warn!("Request to {} failed with status {}", response.url(), status);
            return Err(RequestError::Status(status));
        }
        Ok(())
    }

    /// Announce a login or logout
    pub async fn post_login_state(&self, request: &LoginStateRequest) -> Result<()> {
        self.check_rate_limit()?;
        let url = self.endpoint(EVENT_ENDPOINT)?;
        let body = request.encode()?;

        debug!(
            "Posting login state (logged_in: {}) to {}",
            request.body().logged_in,
            url
        );

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, MSGPACK_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;
        self.check_response(&response)?;

        debug!("Login state accepted");
        Ok(())
    }

    /// Fetch service metadata
    pub async fn get_metadata(&self) -> Result<ServiceMetadata> {
        self.check_rate_limit()?;
        let url = self.endpoint(METADATA_ENDPOINT)?;

        debug!("Fetching metadata from {}", url);

        let response = self.client.get(url).send().await?;
        self.check_response(&response)?;

        let metadata: ServiceMetadata = response.json().await?;
        if let Some(new_url) = &metadata.new_api_url {
            warn!("API reports it has moved to {}", new_url);
        }
        Ok(metadata)
    }

    fn stream_transport(&self) -> ApiTransport {
        ApiTransport::new(self.stream_http.clone(), Arc::clone(&self.rate_limit))
    }

    /// Subscribe to login state changes (binary stream)
    ///
    /// The client starts disconnected.
    pub fn player_event_stream(&self, settings: StreamClientSettings) -> Result<PlayerEventStream> {
        let url = self.endpoint(PLAYER_STREAM_ENDPOINT)?;
        let client = hyperstream::builder()
            .url(url.as_str())
            .codec(BinaryCodec::<PlayerEventStreamUpdate>::new())
            .transport(self.stream_transport())
            .headers(self.session.clone())
            .settings(settings)
            .build()?;
        Ok(client)
    }

    /// Subscribe to service announcements (text stream)
    ///
    /// The client starts disconnected.
    pub fn announcement_stream(&self, settings: StreamClientSettings) -> Result<AnnouncementStream> {
        let url = self.endpoint(ANNOUNCEMENT_STREAM_ENDPOINT)?;
        let client = hyperstream::builder()
            .url(url.as_str())
            .codec(TextCodec::<AnnouncementStreamUpdate>::new())
            .transport(self.stream_transport())
            .headers(self.session.clone())
            .settings(settings)
            .build()?;
        Ok(client)
    }
}

/// Parse a base URL, requiring http(s) and a trailing slash for `join`
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).map_err(|e| RequestError::InvalidUrl(format!("{}: {}", base_url, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RequestError::InvalidUrl(format!(
            "{}: scheme must be http or https",
            base_url
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
