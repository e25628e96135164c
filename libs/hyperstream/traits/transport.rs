use crate::error::Result;
use crate::headers::Headers;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Incrementally consumed response body
///
/// Dropping the stream releases the underlying connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Trait for opening the outbound stream connection
///
/// The stream client owns exactly one transport and calls `open` once per
/// connection attempt. Implementations must not buffer the body in full.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open the stream at `url`
    ///
    /// # Returns
    /// * `Ok(stream)` - The endpoint accepted the request; bytes follow
    /// * `Err(StreamError)` - The endpoint is unreachable or refused the request
    async fn open(&self, url: &str, headers: &Headers) -> Result<ByteStream>;
}
