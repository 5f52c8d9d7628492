//! Report command codes and the inbound device-state message.
//!
//! Uses proper enums with `TryFrom` — no panics on unknown values.

use crate::error::MintakaError;
use std::fmt;

// ── ReportCommand ────────────────────────────────────────────────

/// Command byte carried by every report.
///
/// - `0x01..0x02` — host → device framebuffer transfer
/// - `0x03` — device → host encoder/layer state
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportCommand {
    /// First chunk of a frame; the device starts a fresh buffer.
    Start = 0x01,
    /// Subsequent chunk; appended to the frame in progress.
    Data = 0x02,
    /// The device reports its selected screen and active layer.
    ScreenRequest = 0x03,
}

impl TryFrom<u8> for ReportCommand {
    type Error = MintakaError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(ReportCommand::Start),
            0x02 => Ok(ReportCommand::Data),
            0x03 => Ok(ReportCommand::ScreenRequest),
            _ => Err(MintakaError::Other(format!(
                "unknown report command: {value:#04x}"
            ))),
        }
    }
}

impl fmt::Display for ReportCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportCommand::Start => write!(f, "START"),
            ReportCommand::Data => write!(f, "DATA"),
            ReportCommand::ScreenRequest => write!(f, "SCREEN_REQ"),
        }
    }
}

// ── DeviceStateEvent ─────────────────────────────────────────────

/// The device's encoder position and keymap layer, as last reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceStateEvent {
    /// Screen index selected with the rotary encoder.
    pub screen: u8,
    /// Active keymap layer.
    pub layer: u8,
}

impl DeviceStateEvent {
    pub fn new(screen: u8, layer: u8) -> Self {
        Self { screen, layer }
    }

    /// Encode as the device would send it (for tests and tooling).
    pub fn to_bytes(&self) -> [u8; 3] {
        [ReportCommand::ScreenRequest as u8, self.screen, self.layer]
    }
}

impl fmt::Display for DeviceStateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "screen={} layer={}", self.screen, self.layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_codes() {
        assert_eq!(ReportCommand::Start as u8, 0x01);
        assert_eq!(ReportCommand::Data as u8, 0x02);
        assert_eq!(ReportCommand::ScreenRequest as u8, 0x03);
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(ReportCommand::try_from(0x7F).is_err());
        assert_eq!(
            ReportCommand::try_from(0x03).unwrap(),
            ReportCommand::ScreenRequest
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(ReportCommand::Start.to_string(), "START");
        assert_eq!(DeviceStateEvent::new(2, 1).to_string(), "screen=2 layer=1");
    }
}
