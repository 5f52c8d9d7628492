//! HID device seam.
//!
//! The multiplexer talks to the keyboard through two small traits so the
//! whole control loop can run against a scripted device in tests:
//!
//! - [`HidBackend`] discovers and opens the raw-HID interface.
//! - [`HidChannel`] is one open session: fixed-size writes and
//!   timeout-bounded reads.

mod hid;
pub mod mock;

pub use hid::HidApiBackend;
pub use mock::{MockChannel, MockDevice};

use std::fmt;

use crate::error::MintakaError;

// ── DeviceIds ────────────────────────────────────────────────────

/// Identifiers a HID interface must match exactly to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIds {
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: u16,
    pub usage: u16,
}

impl DeviceIds {
    pub fn new(vendor_id: u16, product_id: u16, usage_page: u16, usage: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            usage_page,
            usage,
        }
    }

    /// Whether an enumerated interface is the one we drive.
    pub fn matches(&self, vendor_id: u16, product_id: u16, usage_page: u16, usage: u16) -> bool {
        self.vendor_id == vendor_id
            && self.product_id == product_id
            && self.usage_page == usage_page
            && self.usage == usage
    }
}

impl Default for DeviceIds {
    /// The Mintaka macropad's raw-HID interface.
    fn default() -> Self {
        Self::new(0x7368, 0x4F1B, 0xFF60, 0x61)
    }
}

impl fmt::Display for DeviceIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} (usage page {:#06x}, usage {:#04x})",
            self.vendor_id, self.product_id, self.usage_page, self.usage
        )
    }
}

// ── Traits ───────────────────────────────────────────────────────

/// An open raw-HID session.
pub trait HidChannel {
    /// Write one complete report (report id included). Returns the
    /// number of bytes accepted.
    fn write(&mut self, report: &[u8]) -> Result<usize, MintakaError>;

    /// Read one inbound report into `buf`, waiting at most `timeout_ms`
    /// milliseconds. `0` never blocks. Returns `Ok(0)` when nothing
    /// arrived in time.
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, MintakaError>;
}

/// Discovers and opens the device.
pub trait HidBackend {
    type Channel: HidChannel;

    /// Open the first interface matching `ids`.
    ///
    /// Fails with [`MintakaError::DeviceNotConnected`] when nothing
    /// matches or the matched path cannot be opened.
    fn open(&mut self, ids: &DeviceIds) -> Result<Self::Channel, MintakaError>;
}
