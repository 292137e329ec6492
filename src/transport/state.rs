//! Connection lifecycle state.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of the streaming connection.
///
/// Transitions only move forward through a session: `Disconnected` →
/// `Connecting` → `Connected` → `Closing` → `Closed`, with `Failed` reachable
/// from `Connecting` and `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Closed,
    Failed,
}

impl ConnectionState {
    /// Whether audio may be sent in this state.
    pub fn can_send(self) -> bool {
        self == ConnectionState::Connected
    }

    /// Whether the connection has reached a state it will not leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Closing,
            4 => ConnectionState::Closed,
            5 => ConnectionState::Failed,
            _ => ConnectionState::Disconnected,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Closing => 3,
            ConnectionState::Closed => 4,
            ConnectionState::Failed => 5,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Shared, lock-free cell holding the current connection state.
///
/// Written by the transport thread, read by the send path and the
/// orchestrator.
#[derive(Debug)]
pub struct StateCell {
    inner: AtomicU8,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            inner: AtomicU8::new(ConnectionState::Disconnected.as_u8()),
        }
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ConnectionState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
