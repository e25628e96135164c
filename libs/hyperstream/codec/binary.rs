//! MessagePack frame codec
//!
//! The stream is a plain concatenation of MessagePack values with no
//! length prefix, so frame boundaries are found by walking the value
//! markers. The single byte `0x90` (an empty array) is the heartbeat.

use crate::traits::{Frame, FrameCodec, Result, StreamError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::marker::PhantomData;

/// Canonical heartbeat frame: an empty MessagePack array
pub const HEARTBEAT_FRAME: &[u8] = &[0x90];

pub struct BinaryCodec<T> {
    _message: PhantomData<fn() -> T>,
}

impl<T> BinaryCodec<T> {
    pub fn new() -> Self {
        Self {
            _message: PhantomData,
        }
    }
}

impl<T> Default for BinaryCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for BinaryCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryCodec").finish()
    }
}

/// Encode a record with the same schema the binary codec decodes
pub fn encode_binary<T: Serialize>(value: &T) -> std::result::Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec(value)
}

/// How a marker byte continues
enum Layout {
    /// Fixed number of bytes after the marker
    Fixed(usize),
    /// Big-endian length of `width` bytes, then `extra` bytes, then the payload
    Sized { width: usize, extra: usize },
    /// Header of `width` bytes holding an item count, times `per_item` nested values
    Container { width: usize, per_item: u64 },
    /// Fixed-size container whose count lives in the marker itself
    FixContainer { count: u64 },
}

fn layout(marker: u8) -> Option<Layout> {
    let layout = match marker {
        0x00..=0x7f | 0xe0..=0xff | 0xc0 | 0xc2 | 0xc3 => Layout::Fixed(0),
        0x80..=0x8f => Layout::FixContainer {
            count: u64::from(marker & 0x0f) * 2,
        },
        0x90..=0x9f => Layout::FixContainer {
            count: u64::from(marker & 0x0f),
        },
        0xa0..=0xbf => Layout::Fixed(usize::from(marker & 0x1f)),
        0xc4 => Layout::Sized { width: 1, extra: 0 },
        0xc5 => Layout::Sized { width: 2, extra: 0 },
        0xc6 => Layout::Sized { width: 4, extra: 0 },
        0xc7 => Layout::Sized { width: 1, extra: 1 },
        0xc8 => Layout::Sized { width: 2, extra: 1 },
        0xc9 => Layout::Sized { width: 4, extra: 1 },
        0xca => Layout::Fixed(4),
        0xcb => Layout::Fixed(8),
        0xcc | 0xd0 => Layout::Fixed(1),
        0xcd | 0xd1 => Layout::Fixed(2),
        0xce | 0xd2 => Layout::Fixed(4),
        0xcf | 0xd3 => Layout::Fixed(8),
        0xd4 => Layout::Fixed(2),
        0xd5 => Layout::Fixed(3),
        0xd6 => Layout::Fixed(5),
        0xd7 => Layout::Fixed(9),
        0xd8 => Layout::Fixed(17),
        0xd9 => Layout::Sized { width: 1, extra: 0 },
        0xda => Layout::Sized { width: 2, extra: 0 },
        0xdb => Layout::Sized { width: 4, extra: 0 },
        0xdc => Layout::Container { width: 2, per_item: 1 },
        0xdd => Layout::Container { width: 4, per_item: 1 },
        0xde => Layout::Container { width: 2, per_item: 2 },
        0xdf => Layout::Container { width: 4, per_item: 2 },
        // 0xc1 is reserved and never valid
        _ => return None,
    };
    Some(layout)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

/// Progress through one partially received MessagePack value
///
/// `pos` is the end of the last element fully present in the buffer and
/// `pending` the number of elements still owed after it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ValueScan {
    pos: usize,
    pending: u64,
    started: bool,
}

/// Resume walking the first MessagePack value in `buf`
///
/// Elements are only committed to `scan` once their header and fixed-size
/// body are fully buffered, so a later call restarts at the first
/// incomplete element.
fn scan_value(buf: &[u8], scan: &mut ValueScan) -> Result<Option<usize>> {
    if !scan.started {
        *scan = ValueScan {
            pos: 0,
            pending: 1,
            started: true,
        };
    }

    while scan.pending > 0 {
        let mut pos = scan.pos;
        let Some(&marker) = buf.get(pos) else {
            return Ok(None);
        };
        let layout = layout(marker).ok_or_else(|| {
            StreamError::CorruptFrame(format!("invalid MessagePack marker 0x{:02x}", marker))
        })?;
        pos += 1;

        let (skip, nested) = match layout {
            Layout::Fixed(len) => (len, 0),
            Layout::FixContainer { count } => (0, count),
            Layout::Sized { width, extra } => {
                let Some(len_bytes) = buf.get(pos..pos + width) else {
                    return Ok(None);
                };
                let Ok(len) = usize::try_from(read_be(len_bytes)) else {
                    return Err(StreamError::CorruptFrame("length overflow".to_string()));
                };
                (width + extra + len, 0)
            }
            Layout::Container { width, per_item } => {
                let Some(count_bytes) = buf.get(pos..pos + width) else {
                    return Ok(None);
                };
                (width, read_be(count_bytes) * per_item)
            }
        };

        pos = match pos.checked_add(skip) {
            Some(next) if next <= buf.len() => next,
            Some(_) => return Ok(None),
            None => return Err(StreamError::CorruptFrame("length overflow".to_string())),
        };
        scan.pos = pos;
        scan.pending = (scan.pending - 1).saturating_add(nested);
    }

    Ok(Some(scan.pos))
}

/// Length of the first complete MessagePack value in `buf`
fn value_len(buf: &[u8]) -> Result<Option<usize>> {
    scan_value(buf, &mut ValueScan::default())
}

impl<T> FrameCodec for BinaryCodec<T>
where
    T: DeserializeOwned + Send + Debug + 'static,
{
    type Message = T;
    type Scan = ValueScan;

    fn scan_frame(&self, buf: &[u8], scan: &mut ValueScan) -> Result<Option<usize>> {
        scan_value(buf, scan)
    }

    fn decode(&self, frame: &[u8]) -> Frame<T> {
        if frame == HEARTBEAT_FRAME {
            return Frame::Heartbeat;
        }

        match rmp_serde::from_slice::<T>(frame) {
            Ok(message) => Frame::Message(message),
            Err(e) => Frame::Malformed(e.to_string()),
        }
    }
}
