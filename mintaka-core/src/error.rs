//! Domain-specific error types for the Mintaka host.
//!
//! All fallible operations return `Result<T, MintakaError>`.
//! None of these conditions is fatal to the host: the multiplexer maps
//! every device and transport failure onto the reconnect cycle.

use thiserror::Error;

/// The canonical error type for the Mintaka host core.
#[derive(Debug, Error)]
pub enum MintakaError {
    // ── Device Errors ────────────────────────────────────────────
    /// No HID interface matched the configured identifiers, or the
    /// matched interface could not be opened.
    #[error("device not connected")]
    DeviceNotConnected,

    /// The HID library reported an error.
    #[error("hid error: {0}")]
    Hid(#[from] hidapi::HidError),

    // ── Transport Errors ─────────────────────────────────────────
    /// A report read or write failed mid-session.
    #[error("transport error: {0}")]
    Transport(String),

    /// A bitmap did not have the fixed framebuffer size.
    #[error("invalid frame size: expected {expected} bytes, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// A connection phase transition was requested from the wrong state.
    #[error("invalid connection transition: {0}")]
    InvalidTransition(&'static str),

    // ── Audio Errors ─────────────────────────────────────────────
    /// The audio capture stream could not be opened or failed while running.
    #[error("audio capture failed: {0}")]
    AudioCapture(String),

    /// Analyzer parameters were rejected.
    #[error("invalid audio config: {0}")]
    InvalidAudioConfig(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl MintakaError {
    /// Whether this error means the live device link is gone.
    pub fn is_link_loss(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotConnected | Self::Hid(_) | Self::Transport(_)
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for MintakaError {
    fn from(s: String) -> Self {
        MintakaError::Other(s)
    }
}

impl From<&str> for MintakaError {
    fn from(s: &str) -> Self {
        MintakaError::Other(s.to_string())
    }
}

// Required by the `tokio_util::codec::Encoder` bound on `Error`.
impl From<std::io::Error> for MintakaError {
    fn from(e: std::io::Error) -> Self {
        MintakaError::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = MintakaError::DeviceNotConnected;
        assert!(e.to_string().contains("not connected"));

        let e = MintakaError::InvalidFrameSize {
            expected: 1024,
            actual: 1000,
        };
        assert!(e.to_string().contains("1024"));
        assert!(e.to_string().contains("1000"));
    }

    #[test]
    fn from_string() {
        let e: MintakaError = "something broke".into();
        assert!(matches!(e, MintakaError::Other(_)));
    }

    #[test]
    fn link_loss_classification() {
        assert!(MintakaError::Transport("write".into()).is_link_loss());
        assert!(MintakaError::DeviceNotConnected.is_link_loss());
        assert!(!MintakaError::AudioCapture("no device".into()).is_link_loss());
    }
}
