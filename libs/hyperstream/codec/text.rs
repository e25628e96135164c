//! Line-delimited text codec for server-sent-style streams
//!
//! Each line is form-URL-decoded and trimmed. An empty line or a lone `:`
//! is a heartbeat; otherwise a leading `data:` field prefix is removed and
//! the rest is parsed as JSON. The payload itself is never rewritten, and
//! any other field (`event:`, `id:`) fails to parse and is malformed.

use crate::traits::{Frame, FrameCodec, Result};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::marker::PhantomData;

/// Field prefix carrying the payload
pub const DATA_FIELD_PREFIX: &str = "data:";

/// Line carrying nothing but this delimiter is a heartbeat
pub const HEARTBEAT_DELIMITER: &str = ":";

pub struct TextCodec<T> {
    _message: PhantomData<fn() -> T>,
}

impl<T> TextCodec<T> {
    pub fn new() -> Self {
        Self {
            _message: PhantomData,
        }
    }
}

impl<T> Default for TextCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TextCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextCodec").finish()
    }
}

/// Form-URL-decode a line: `+` becomes a space, then `%XX` escapes are resolved
fn url_decode(line: &str) -> String {
    let spaced = line.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

impl<T> FrameCodec for TextCodec<T>
where
    T: DeserializeOwned + Send + Debug + 'static,
{
    type Message = T;
    /// Bytes already known to hold no newline
    type Scan = usize;

    fn scan_frame(&self, buf: &[u8], scanned: &mut usize) -> Result<Option<usize>> {
        let from = (*scanned).min(buf.len());
        match buf[from..].iter().position(|b| *b == b'\n') {
            Some(offset) => Ok(Some(from + offset + 1)),
            None => {
                *scanned = buf.len();
                Ok(None)
            }
        }
    }

    fn decode(&self, frame: &[u8]) -> Frame<T> {
        let line = String::from_utf8_lossy(frame);
        let decoded = url_decode(line.trim_end_matches(['\n', '\r']));
        let trimmed = decoded.trim();

        if trimmed.is_empty() || trimmed == HEARTBEAT_DELIMITER {
            return Frame::Heartbeat;
        }

        let payload = trimmed
            .strip_prefix(DATA_FIELD_PREFIX)
            .unwrap_or(trimmed)
            .trim();
        if payload.is_empty() {
            return Frame::Malformed("empty data field".to_string());
        }

        match serde_json::from_str::<T>(payload) {
            Ok(message) => Frame::Message(message),
            Err(e) => Frame::Malformed(e.to_string()),
        }
    }
}
