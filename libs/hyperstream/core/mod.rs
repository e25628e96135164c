//! # Stream client core
//!
//! ## Example
//!
//! ```rust,ignore
//! use hyperstream::{BinaryCodec, StreamEvent};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> hyperstream::Result<()> {
//!     let client = hyperstream::builder()
//!         .url("https://api.example.com/api/stream")
//!         .codec(BinaryCodec::<MyUpdate>::new())
//!         .reconnect_delays(
//!             Duration::from_secs(5),
//!             Duration::from_secs(60),
//!             Duration::from_secs(5),
//!         )
//!         .heartbeat_timeout(Duration::from_secs(75))
//!         .build()?;
//!
//!     client.connect()?;
//!
//!     let events = client.events();
//!     while let Ok(event) = events.recv() {
//!         if let StreamEvent::Message(update) = event {
//!             println!("Update: {:?}", update);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod heartbeat;
pub mod transport;

// Re-export main types
pub use builder::{states, StreamClientBuilder};
pub use client::{Metrics, StreamClient, StreamEvent};
pub use config::{ClientConfig, StreamClientSettings};
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use heartbeat::HeartbeatWatchdog;
pub use transport::HttpTransport;

/// Create a new stream client builder
///
/// This is a convenience function for starting the builder pattern.
pub fn builder() -> StreamClientBuilder<builder::states::NoUrl, builder::states::NoCodec, ()> {
    StreamClientBuilder::new()
}
