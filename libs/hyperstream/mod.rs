//! # HyperStream
//!
//! A resilient client for long-lived HTTP event streams.
//!
//! ## Features
//!
//! - **Actor-owned state machine**: One task serializes every connection transition
//! - **Linear backoff**: Reconnects forever (or up to a limit) after any failure
//! - **Pluggable framing**: Line-based text events or length-delimited MessagePack
//! - **Heartbeat watchdog**: Silent connections are faulted and retried
//! - **Type-state builder**: Compile-time guarantees for required configuration

pub mod codec;
pub mod core;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use core::{
    builder, client, config, connection_state, heartbeat, transport,
    builder::{states, StreamClientBuilder},
    client::{Metrics, StreamClient, StreamEvent},
    config::{ClientConfig, StreamClientSettings},
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    heartbeat::HeartbeatWatchdog,
    transport::HttpTransport,
};

// Re-export codecs
pub use codec::{encode_binary, BinaryCodec, FrameReader, TextCodec, HEARTBEAT_FRAME};

// Convenience function
pub use core::builder as client_builder;

/// Type alias for Result with StreamError
pub type Result<T> = std::result::Result<T, traits::StreamError>;
