//! `hidapi`-backed implementation of the device seam.

use hidapi::{HidApi, HidDevice, HidError};
use tracing::debug;

use super::{DeviceIds, HidBackend, HidChannel};
use crate::error::MintakaError;

type InitFn = fn() -> Result<HidApi, HidError>;

/// Enumerates and opens devices through the system HID library.
///
/// The library is initialised on the first attempt and again after a
/// failed one, so a missing or broken HID stack only keeps the device
/// disconnected.
pub struct HidApiBackend {
    api: Option<HidApi>,
    init: InitFn,
}

impl HidApiBackend {
    pub fn new() -> Self {
        Self::with_init(HidApi::new)
    }

    fn with_init(init: InitFn) -> Self {
        Self { api: None, init }
    }

    fn api(&mut self) -> Result<&mut HidApi, MintakaError> {
        if self.api.is_none() {
            let api = (self.init)().map_err(|e| {
                debug!("hid library unavailable: {e}");
                MintakaError::DeviceNotConnected
            })?;
            self.api = Some(api);
        }
        self.api.as_mut().ok_or(MintakaError::DeviceNotConnected)
    }
}

impl Default for HidApiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HidBackend for HidApiBackend {
    type Channel = HidDevice;

    fn open(&mut self, ids: &DeviceIds) -> Result<HidDevice, MintakaError> {
        let api = self.api()?;
        if let Err(e) = api.refresh_devices() {
            debug!("hid enumeration failed: {e}");
            self.api = None;
            return Err(MintakaError::DeviceNotConnected);
        }

        let info = api
            .device_list()
            .find(|d| ids.matches(d.vendor_id(), d.product_id(), d.usage_page(), d.usage()))
            .ok_or(MintakaError::DeviceNotConnected)?;

        debug!("opening HID interface {:?}", info.path());
        info.open_device(api).map_err(|e| {
            debug!("open failed: {e}");
            MintakaError::DeviceNotConnected
        })
    }
}

impl HidChannel for HidDevice {
    fn write(&mut self, report: &[u8]) -> Result<usize, MintakaError> {
        HidDevice::write(self, report).map_err(|e| MintakaError::Transport(format!("write: {e}")))
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, MintakaError> {
        HidDevice::read_timeout(self, buf, timeout_ms)
            .map_err(|e| MintakaError::Transport(format!("read: {e}")))
    }
}
