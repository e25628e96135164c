//! HTTP transport backed by reqwest
//!
//! Issues a GET and hands the body back as an incremental byte stream.
//! Invalid header names or values are skipped with a warning rather than
//! failing the connection.

use crate::traits::*;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::{debug, warn};

/// Default [`Transport`]: a streaming HTTP GET
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Wrap an existing reqwest client
    ///
    /// The client must not set a total request timeout, or long-lived
    /// streams will be cut off when it elapses.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Convert a header map, dropping entries reqwest would reject
pub fn to_header_map(headers: &Headers) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let Ok(name) = key.parse::<HeaderName>() else {
            warn!("Invalid header name: {}", key);
            continue;
        };
        let Ok(value) = value.parse::<HeaderValue>() else {
            warn!("Invalid header value for key '{}'", key);
            continue;
        };
        map.insert(name, value);
    }
    map
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, url: &str, headers: &Headers) -> Result<ByteStream> {
        debug!("Opening stream at {}", url);

        let response = self
            .client
            .get(url)
            .headers(to_header_map(headers))
            .send()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        let status = response.status();
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_invalid_headers_are_skipped() {
        let mut headers = HashMap::new();
        headers.insert("User-Agent".to_string(), "GoodFriend/1.0".to_string());
        headers.insert("bad header".to_string(), "x".to_string());
        headers.insert("X-Bad-Value".to_string(), "line\nbreak".to_string());

        let map = to_header_map(&headers);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("user-agent").unwrap(), "GoodFriend/1.0");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::default();
        let url = format!("http://{}/api/stream", addr);
        let result = transport.open(&url, &HashMap::new()).await;
        assert!(matches!(result, Err(StreamError::Transport(_))));
    }
}
