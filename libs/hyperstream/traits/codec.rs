use crate::error::Result;
use std::fmt::Debug;

/// Outcome of decoding one frame
///
/// A heartbeat never produces a message, and a malformed frame is only
/// reported so it can be counted and skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame<T> {
    /// Content-free keep-alive frame
    Heartbeat,
    /// Well-formed payload
    Message(T),
    /// The frame was delimited correctly but its payload could not be decoded
    Malformed(String),
}

impl<T> Frame<T> {
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Frame::Heartbeat)
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Frame::Malformed(_))
    }

    /// Get the decoded payload, if any
    pub fn into_message(self) -> Option<T> {
        match self {
            Frame::Message(message) => Some(message),
            Frame::Heartbeat | Frame::Malformed(_) => None,
        }
    }
}

/// Trait for splitting a byte stream into frames and decoding them
///
/// Framing and decoding are separate steps: a codec that cannot decode a
/// frame still knows where it ends, so the stream survives a corrupt payload.
/// Only a framing failure (`scan_frame` returning `Err`) ends the connection.
///
/// Framing is resumable. The reader keeps one `Scan` per partially received
/// frame and passes it back on every call, so each byte is examined once
/// no matter how finely the frame was chunked.
pub trait FrameCodec: Send + Sync + 'static {
    /// The decoded payload type
    type Message: Send + Debug + 'static;

    /// Progress through a partially received frame
    type Scan: Default + Send + 'static;

    /// Length of the next complete frame at the start of `buf`
    ///
    /// `scan` is fresh (`Default`) for a new frame and holds the previous
    /// progress when `buf` only grew since the last call.
    ///
    /// # Returns
    /// * `Ok(Some(len))` - `buf[..len]` holds one complete frame (delimiters included)
    /// * `Ok(None)` - more bytes are needed
    /// * `Err(StreamError::CorruptFrame)` - the stream cannot be resynchronised
    fn scan_frame(&self, buf: &[u8], scan: &mut Self::Scan) -> Result<Option<usize>>;

    /// [`scan_frame`](Self::scan_frame) from the start of `buf`
    fn split_frame(&self, buf: &[u8]) -> Result<Option<usize>> {
        self.scan_frame(buf, &mut Self::Scan::default())
    }

    /// Decode one complete frame as returned by `scan_frame`
    fn decode(&self, frame: &[u8]) -> Frame<Self::Message>;
}
