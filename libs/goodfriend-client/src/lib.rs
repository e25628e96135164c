//! GoodFriend API client
//!
//! Record shapes, identity hashing, one-shot requests and the two event
//! streams, built on [`hyperstream`].

pub mod config;
pub mod hashing;
pub mod rate_limit;
pub mod requests;
pub mod rest;
pub mod types;

pub use config::{ClientConfig, ConfigError, StreamConfig};
pub use hashing::{generate_salt, HashError, HashedIdentifier, IdentityHasher, DEFAULT_BUILD_ID};
pub use rate_limit::RateLimitClock;
pub use requests::{
    LoginStateRequest, RequestError, CONTENT_ID_HASH_LENGTH, CONTENT_ID_SALT_LENGTH,
};
pub use rest::{AnnouncementStream, ApiClient, ApiTransport, PlayerEventStream};
pub use types::*;
