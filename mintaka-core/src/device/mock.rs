//! Scripted in-memory device for tests and dry runs.
//!
//! A [`MockDevice`] is a cloneable handle to shared state: tests keep
//! one clone to plug/unplug the device, queue inbound reports and
//! inspect what was written, while the multiplexer owns another as its
//! [`HidBackend`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{DeviceIds, HidBackend, HidChannel};
use crate::error::MintakaError;
use crate::message::DeviceStateEvent;

#[derive(Debug, Default)]
struct MockState {
    present: bool,
    inbound: VecDeque<Vec<u8>>,
    /// Returned once the queue is empty; a device that never goes quiet.
    flood: Option<Vec<u8>>,
    read_timeouts: Vec<i32>,
    written: Vec<Vec<u8>>,
    fail_next_write: bool,
    opens: usize,
}

/// Handle to a scripted device.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    /// A device that starts unplugged.
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that is already attached.
    pub fn plugged() -> Self {
        let dev = Self::new();
        dev.plug();
        dev
    }

    pub fn plug(&self) {
        self.lock().present = true;
    }

    /// Detach the device. Open channels start failing immediately.
    pub fn unplug(&self) {
        self.lock().present = false;
    }

    /// Make the next report write fail once.
    pub fn fail_next_write(&self) {
        self.lock().fail_next_write = true;
    }

    /// Queue raw bytes for the host to read.
    pub fn queue_raw(&self, data: &[u8]) {
        self.lock().inbound.push_back(data.to_vec());
    }

    /// Queue an encoder/layer state report.
    pub fn queue_state(&self, screen: u8, layer: u8) {
        self.queue_raw(&DeviceStateEvent::new(screen, layer).to_bytes());
    }

    /// Answer every read with this state report, without end.
    pub fn flood_state(&self, screen: u8, layer: u8) {
        self.lock().flood = Some(DeviceStateEvent::new(screen, layer).to_bytes().to_vec());
    }

    /// The `timeout_ms` of every read so far, in order.
    pub fn read_timeouts(&self) -> Vec<i32> {
        self.lock().read_timeouts.clone()
    }

    /// Every report written so far, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock().written.clone()
    }

    /// Drain and return the written reports.
    pub fn take_written(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.lock().written)
    }

    /// How many times the device has been opened.
    pub fn open_count(&self) -> usize {
        self.lock().opens
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HidBackend for MockDevice {
    type Channel = MockChannel;

    fn open(&mut self, _ids: &DeviceIds) -> Result<MockChannel, MintakaError> {
        let mut state = self.lock();
        if !state.present {
            return Err(MintakaError::DeviceNotConnected);
        }
        state.opens += 1;
        Ok(MockChannel {
            device: self.clone(),
        })
    }
}

// ── MockChannel ──────────────────────────────────────────────────

/// An open session on a [`MockDevice`].
///
/// Reads never actually wait: an empty queue returns `Ok(0)` at once.
#[derive(Debug, Clone)]
pub struct MockChannel {
    device: MockDevice,
}

impl HidChannel for MockChannel {
    fn write(&mut self, report: &[u8]) -> Result<usize, MintakaError> {
        let mut state = self.device.lock();
        if !state.present {
            return Err(MintakaError::Transport("write: device unplugged".into()));
        }
        if std::mem::take(&mut state.fail_next_write) {
            return Err(MintakaError::Transport("write: injected failure".into()));
        }
        state.written.push(report.to_vec());
        Ok(report.len())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, MintakaError> {
        let mut state = self.device.lock();
        if !state.present {
            return Err(MintakaError::Transport("read: device unplugged".into()));
        }
        state.read_timeouts.push(timeout_ms);
        match state.inbound.pop_front().or_else(|| state.flood.clone()) {
            Some(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }
}
