//! # HyperStream Traits
//!
//! Core traits and types shared by the stream client and its collaborators:
//!
//! - **FrameCodec**: Split a byte stream into frames and decode them
//! - **Transport**: Open the outbound connection
//! - **HeaderProvider**: Identification headers sent on every connect
//! - **ReconnectionStrategy**: Control reconnection delays
//!
//! ## Example
//!
//! ```rust,ignore
//! use hyperstream::traits::*;
//!
//! struct LineCodec;
//!
//! impl FrameCodec for LineCodec {
//!     type Message = String;
//!     type Scan = ();
//!
//!     fn scan_frame(&self, buf: &[u8], _scan: &mut ()) -> Result<Option<usize>> {
//!         Ok(buf.iter().position(|b| *b == b'\n').map(|i| i + 1))
//!     }
//!
//!     fn decode(&self, frame: &[u8]) -> Frame<String> {
//!         Frame::Message(String::from_utf8_lossy(frame).trim().to_string())
//!     }
//! }
//! ```

pub mod codec;
pub mod error;
pub mod headers;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use codec::{Frame, FrameCodec};
pub use error::{Result, StreamError};
pub use headers::{
    session_identifier, HeaderProvider, Headers, NoHeaders, SessionHeaders, SESSION_IDENTIFIER_HEADER,
};
pub use reconnect::{BackoffState, LinearBackoff, ReconnectionStrategy};
pub use transport::{ByteStream, Transport};
