use crate::hashing::{HashedIdentifier, DIGEST_LENGTH, SALT_LENGTH};
use crate::types::PlayerEventStreamUpdate;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Exact length of a content id hash
pub const CONTENT_ID_HASH_LENGTH: usize = DIGEST_LENGTH;

/// Exact length of a content id salt
pub const CONTENT_ID_SALT_LENGTH: usize = SALT_LENGTH;

/// Endpoint for login state changes
pub const EVENT_ENDPOINT: &str = "api/event";

/// Endpoint for service metadata
pub const METADATA_ENDPOINT: &str = "api/metadata";

/// Binary player event stream
pub const PLAYER_STREAM_ENDPOINT: &str = "api/stream";

/// Text announcement stream
pub const ANNOUNCEMENT_STREAM_ENDPOINT: &str = "api/announcements/stream";

/// Content type of MessagePack request bodies
pub const MSGPACK_CONTENT_TYPE: &str = "application/msgpack";

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("{field} must be exactly {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Rate limited, retry in {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed with status {0}")]
    Status(StatusCode),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Stream client error: {0}")]
    Stream(#[from] hyperstream::StreamError),
}

pub type Result<T> = std::result::Result<T, RequestError>;

fn exact<const N: usize>(field: &'static str, bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| RequestError::InvalidLength {
        field,
        expected: N,
        actual: bytes.len(),
    })
}

/// Validated body for `POST api/event`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStateRequest {
    body: PlayerEventStreamUpdate,
}

impl LoginStateRequest {
    /// # Errors
    /// `RequestError::InvalidLength` when the hash is not 32 bytes or the
    /// salt is not 16 bytes.
    pub fn new(
        content_id_hash: &[u8],
        content_id_salt: &[u8],
        logged_in: bool,
        territory_id: u16,
        world_id: u32,
    ) -> Result<Self> {
        let content_id_hash = exact::<CONTENT_ID_HASH_LENGTH>("content_id_hash", content_id_hash)?;
        let content_id_salt = exact::<CONTENT_ID_SALT_LENGTH>("content_id_salt", content_id_salt)?;

        Ok(Self {
            body: PlayerEventStreamUpdate {
                content_id_hash,
                content_id_salt,
                logged_in,
                territory_id,
                world_id,
            },
        })
    }

    /// Build from a freshly hashed identifier; lengths are correct by construction
    pub fn from_identifier(
        identifier: HashedIdentifier,
        logged_in: bool,
        territory_id: u16,
        world_id: u32,
    ) -> Self {
        Self {
            body: PlayerEventStreamUpdate {
                content_id_hash: identifier.digest,
                content_id_salt: identifier.salt,
                logged_in,
                territory_id,
                world_id,
            },
        }
    }

    pub fn body(&self) -> &PlayerEventStreamUpdate {
        &self.body
    }

    /// MessagePack body in the stream's schema
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(hyperstream::encode_binary(&self.body)?)
    }
}
