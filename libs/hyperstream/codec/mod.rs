//! Framing codecs and the buffering frame reader
//!
//! ```text
//! HTTP body chunks ──> FrameReader (BytesMut) ──scan_frame──> frame bytes ──decode──> Frame<T>
//! ```
//!
//! Chunks may split a frame anywhere; the reader keeps the partial tail
//! and the codec's scan progress until the codec reports a complete frame.

pub mod binary;
pub mod text;

pub use binary::{encode_binary, BinaryCodec, ValueScan, HEARTBEAT_FRAME};
pub use text::TextCodec;

use crate::traits::{Frame, FrameCodec, Result, StreamError};
use bytes::BytesMut;
use std::sync::Arc;

/// Upper bound on a single buffered frame
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Accumulates body bytes and yields decoded frames in arrival order
pub struct FrameReader<C: FrameCodec> {
    codec: Arc<C>,
    buffer: BytesMut,
    scan: C::Scan,
    max_frame_len: usize,
}

impl<C: FrameCodec> FrameReader<C> {
    pub fn new(codec: Arc<C>) -> Self {
        Self::with_max_frame_len(codec, DEFAULT_MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(codec: Arc<C>, max_frame_len: usize) -> Self {
        Self {
            codec,
            buffer: BytesMut::new(),
            scan: C::Scan::default(),
            max_frame_len,
        }
    }

    /// Append bytes read from the transport
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete frame off the buffer
    ///
    /// # Returns
    /// * `Ok(Some(frame))` - One frame decoded (possibly heartbeat or malformed)
    /// * `Ok(None)` - The buffer holds at most a partial frame
    /// * `Err(StreamError::CorruptFrame)` - Framing is lost for this connection
    pub fn next_frame(&mut self) -> Result<Option<Frame<C::Message>>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.codec.scan_frame(&self.buffer, &mut self.scan)? {
            Some(0) => Err(StreamError::CorruptFrame(
                "codec returned an empty frame".to_string(),
            )),
            Some(len) => {
                self.scan = C::Scan::default();
                let frame = self.buffer.split_to(len);
                Ok(Some(self.codec.decode(&frame)))
            }
            None if self.buffer.len() > self.max_frame_len => Err(StreamError::CorruptFrame(
                format!("frame exceeds {} bytes", self.max_frame_len),
            )),
            None => Ok(None),
        }
    }

    /// Bytes waiting for the rest of their frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial frame (used when a connection ends)
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scan = C::Scan::default();
    }
}
