//! Lifecycle of the HID link.
//!
//! Transitions are checked; an illegal one is an
//! [`MintakaError::InvalidTransition`], never a panic.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::MintakaError;

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of the device link.
///
/// ```text
///  Disconnected ──► Connecting ──► Connected
///       ▲               │              │
///       └───────────────┴──────────────┘
///         (not found)      (transport error)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No open interface. Initial state.
    #[default]
    Disconnected,

    /// Enumerating and opening the interface.
    Connecting,

    /// Interface open; frames are flowing.
    Connected {
        /// When the link entered the `Connected` state.
        since: Instant,
    },
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected { .. } => "Connected",
        })
    }
}

impl ConnectionPhase {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Idle between attempts.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the link has been up. `None` for any other phase.
    pub fn connected_duration(&self) -> Option<Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    /// The coarse status reported to the outside world.
    pub fn status(&self) -> ConnectionStatus {
        if self.is_connected() {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// `Disconnected → Connecting`.
    pub fn begin_connect(&mut self) -> Result<(), MintakaError> {
        self.advance(
            Self::is_disconnected,
            Self::Connecting,
            "begin_connect outside Disconnected",
        )
    }

    /// `Connecting → Connected`, stamping the connect time.
    pub fn complete_connect(&mut self) -> Result<(), MintakaError> {
        let next = Self::Connected {
            since: Instant::now(),
        };
        self.advance(Self::is_connecting, next, "complete_connect outside Connecting")
    }

    /// `Connecting → Disconnected` when the device was not found or
    /// could not be opened.
    pub fn fail_connect(&mut self) -> Result<(), MintakaError> {
        self.advance(
            Self::is_connecting,
            Self::Disconnected,
            "fail_connect outside Connecting",
        )
    }

    /// Drop to `Disconnected` from anywhere; a read or write failed
    /// mid-session.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }

    fn is_connecting(&self) -> bool {
        *self == Self::Connecting
    }

    fn advance(
        &mut self,
        allowed: fn(&Self) -> bool,
        next: Self,
        violation: &'static str,
    ) -> Result<(), MintakaError> {
        if !allowed(self) {
            return Err(MintakaError::InvalidTransition(violation));
        }
        *self = next;
        Ok(())
    }
}

// ── ConnectionStatus ─────────────────────────────────────────────

/// Edge notification emitted by the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connected => "Device connected",
            Self::Disconnected => "Device not connected",
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
