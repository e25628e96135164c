use async_trait::async_trait;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::OnceLock;

/// HTTP headers to send with the stream request
pub type Headers = HashMap<String, String>;

/// Header carrying the per-process session identifier
pub const SESSION_IDENTIFIER_HEADER: &str = "X-Session-Identifier";

/// Trait for providing HTTP headers dynamically
///
/// Called on every connection and reconnection, so implementations may
/// produce fresh values (tokens, timestamps) each time.
///
/// # Example
/// ```ignore
/// struct ApiKeyHeaders {
///     api_key: String,
/// }
///
/// #[async_trait::async_trait]
/// impl HeaderProvider for ApiKeyHeaders {
///     async fn get_headers(&self) -> Headers {
///         let mut headers = HashMap::new();
///         headers.insert("Authorization".to_string(), self.api_key.clone());
///         headers
///     }
/// }
/// ```
#[async_trait]
pub trait HeaderProvider: Send + Sync {
    /// Generate headers to send with the stream request
    async fn get_headers(&self) -> Headers;
}

/// A no-op header provider that doesn't add any headers
pub struct NoHeaders;

#[async_trait]
impl HeaderProvider for NoHeaders {
    async fn get_headers(&self) -> Headers {
        HashMap::new()
    }
}

/// Random session identifier shared by every request from this process
pub fn session_identifier() -> &'static str {
    static SESSION_ID: OnceLock<String> = OnceLock::new();
    SESSION_ID.get_or_init(|| {
        let mut bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    })
}

/// Standard identification headers: client name/version and session id
#[derive(Debug, Clone)]
pub struct SessionHeaders {
    user_agent: String,
    extra: Headers,
}

impl SessionHeaders {
    /// # Arguments
    /// * `client_name` - Product token for the `User-Agent` header
    /// * `client_version` - Version appended to the product token
    pub fn new(client_name: &str, client_version: &str) -> Self {
        Self {
            user_agent: format!("{}/{}", client_name, client_version),
            extra: HashMap::new(),
        }
    }

    /// Add a static header sent alongside the identification headers
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Snapshot of every header this provider emits
    pub fn to_headers(&self) -> Headers {
        let mut headers = self.extra.clone();
        headers.insert("User-Agent".to_string(), self.user_agent.clone());
        headers.insert(
            SESSION_IDENTIFIER_HEADER.to_string(),
            session_identifier().to_string(),
        );
        headers
    }
}

#[async_trait]
impl HeaderProvider for SessionHeaders {
    async fn get_headers(&self) -> Headers {
        self.to_headers()
    }
}
