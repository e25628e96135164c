//! Lock-free connection state and metrics
//!
//! The actor task is the only writer. Any thread may read.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle of a stream client
///
/// ```text
/// Disconnected ──connect──> Connecting ──first bytes──> Connected
///      ^                        │                          │
///      │                        └──────failure──────> Faulted <─┘
///      │                                                 │ backoff elapsed → Connecting
///      └──────────── Disconnecting <──disconnect─────────┘ (from any active state)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Initial and terminal state, no resources held
    Disconnected = 0,
    /// Transport being opened
    Connecting = 1,
    /// Read loop active
    Connected = 2,
    /// Transitional, no I/O
    Disconnecting = 3,
    /// Read loop ended abnormally, waiting for a retry
    Faulted = 4,
}

impl ConnectionState {
    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Disconnecting,
            4 => ConnectionState::Faulted,
            _ => ConnectionState::Disconnected,
        }
    }

    /// `Connect` is a no-op in these states
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }

    /// `Disconnect` is a no-op in these states
    #[inline]
    pub fn is_idle(self) -> bool {
        matches!(
            self,
            ConnectionState::Disconnecting | ConnectionState::Disconnected
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Atomic wrapper around [`ConnectionState`]
#[derive(Debug)]
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// Store a new state, returning the previous one
    #[inline]
    pub fn set(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.inner.swap(state as u8, Ordering::AcqRel))
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    #[inline]
    pub fn is_faulted(&self) -> bool {
        self.get() == ConnectionState::Faulted
    }
}

/// Counters updated by the actor task
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    connect_attempts: AtomicU64,
    messages_received: AtomicU64,
    heartbeats_received: AtomicU64,
    malformed_frames: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_connect_attempts(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_messages(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_heartbeats(&self) {
        self.heartbeats_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_malformed(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn heartbeats_received(&self) -> u64 {
        self.heartbeats_received.load(Ordering::Relaxed)
    }

    pub fn malformed_frames(&self) -> u64 {
        self.malformed_frames.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_atomic() {
        let state = AtomicConnectionState::new(ConnectionState::Disconnected);
        for next in [
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Faulted,
            ConnectionState::Disconnecting,
            ConnectionState::Disconnected,
        ] {
            state.set(next);
            assert_eq!(state.get(), next);
        }
    }

    #[test]
    fn test_set_returns_previous() {
        let state = AtomicConnectionState::new(ConnectionState::Connecting);
        assert_eq!(state.set(ConnectionState::Connected), ConnectionState::Connecting);
        assert!(state.is_connected());
    }

    #[test]
    fn test_active_and_idle_states() {
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Connected.is_active());
        assert!(!ConnectionState::Faulted.is_active());
        assert!(ConnectionState::Disconnected.is_idle());
        assert!(ConnectionState::Disconnecting.is_idle());
        assert!(!ConnectionState::Faulted.is_idle());
    }

    #[test]
    fn test_metrics_counters() {
        let metrics = AtomicMetrics::new();
        metrics.increment_messages();
        metrics.increment_messages();
        metrics.increment_heartbeats();
        metrics.increment_malformed();
        metrics.increment_connect_attempts();
        assert_eq!(metrics.messages_received(), 2);
        assert_eq!(metrics.heartbeats_received(), 1);
        assert_eq!(metrics.malformed_frames(), 1);
        assert_eq!(metrics.connect_attempts(), 1);
        assert_eq!(metrics.reconnect_count(), 0);
    }
}
