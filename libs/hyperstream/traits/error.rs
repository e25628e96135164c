use std::time::Duration;
use thiserror::Error;

/// Main error type for hyperstream
///
/// Errors raised inside the read loop never escape to the caller; they are
/// converted into a state transition plus a [`StreamEvent::Error`] notification.
///
/// [`StreamEvent::Error`]: crate::core::client::StreamEvent::Error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Connection refused, DNS failure, timeout or a broken body read
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// The server closed the body while the client still wanted it
    #[error("Connection to stream suddenly closed")]
    UnexpectedEndOfStream,

    /// No bytes arrived within the configured heartbeat timeout
    #[error("No heartbeat received within {0:?}")]
    HeartbeatTimeout(Duration),

    /// Framing can no longer be resynchronised on this connection
    #[error("Corrupt frame: {0}")]
    CorruptFrame(String),

    /// The client has been disposed and rejects further operations
    #[error("Stream client has been disposed")]
    Disposed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal channel closed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

impl StreamError {
    /// Whether this failure should schedule a reconnection attempt
    ///
    /// Everything that happens on the wire is recoverable. Usage errors are not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            StreamError::Disposed | StreamError::Configuration(_) | StreamError::ChannelClosed(_)
        )
    }
}

/// Result type for hyperstream operations
pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_failures_are_recoverable() {
        assert!(StreamError::Transport("refused".into()).is_recoverable());
        assert!(StreamError::Http { status: 503 }.is_recoverable());
        assert!(StreamError::UnexpectedEndOfStream.is_recoverable());
        assert!(StreamError::HeartbeatTimeout(Duration::from_secs(1)).is_recoverable());
        assert!(StreamError::CorruptFrame("bad marker".into()).is_recoverable());
    }

    #[test]
    fn test_usage_errors_are_fatal() {
        assert!(!StreamError::Disposed.is_recoverable());
        assert!(!StreamError::Configuration("min > max".into()).is_recoverable());
    }

    #[test]
    fn test_end_of_stream_message() {
        assert_eq!(
            StreamError::UnexpectedEndOfStream.to_string(),
            "Connection to stream suddenly closed"
        );
    }
}
