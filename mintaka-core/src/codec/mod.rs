//! Report codec: framebuffer → outbound reports, inbound bytes →
//! [`DeviceStateEvent`].
//!
//! ## Wire format
//!
//! **Outbound report** (32 bytes):
//! ```text
//! report_id:  u8        (1)  always 0x00
//! command:    u8        (1)  0x01 START | 0x02 DATA
//! payload:    [u8; 30]  (30) bitmap bytes, zero-padded in the last report
//! ```
//!
//! A 1024-byte frame therefore takes 35 reports; the last one carries
//! 4 payload bytes. `START` only tells the firmware to begin a fresh
//! buffer. It is not a sequence number, so a lost or reordered `DATA`
//! report cannot be detected here.
//!
//! **Inbound report** (≥ 3 bytes):
//! ```text
//! command:    u8  0x03 SCREEN_REQ
//! screen:     u8
//! layer:      u8
//! ```
//! Anything else is ignored.

use bytes::BytesMut;
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::device::HidChannel;
use crate::error::MintakaError;
use crate::framebuffer::{FRAMEBUFFER_SIZE, Framebuffer};
use crate::message::{DeviceStateEvent, ReportCommand};

// ── Constants ────────────────────────────────────────────────────

/// Size of every outbound report, report id included.
pub const REPORT_SIZE: usize = 32;

/// HID report identifier (the interface uses unnumbered reports).
pub const REPORT_ID: u8 = 0x00;

/// Report id + command byte.
pub const REPORT_HEADER_SIZE: usize = 2;

/// Bitmap bytes carried per report.
pub const PAYLOAD_SIZE: usize = REPORT_SIZE - REPORT_HEADER_SIZE;

/// Reports needed for one frame.
pub const REPORTS_PER_FRAME: usize = FRAMEBUFFER_SIZE.div_ceil(PAYLOAD_SIZE);

/// Upper bound on queued reports drained in one poll, so a device that
/// floods the host cannot stall the loop.
const MAX_DRAIN: usize = 256;

// ── Report ───────────────────────────────────────────────────────

/// One outbound report.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Report([u8; REPORT_SIZE]);

impl Report {
    fn new(command: ReportCommand, chunk: &[u8]) -> Self {
        debug_assert!(chunk.len() <= PAYLOAD_SIZE);
        let mut buf = [0u8; REPORT_SIZE];
        buf[0] = REPORT_ID;
        buf[1] = command as u8;
        buf[REPORT_HEADER_SIZE..REPORT_HEADER_SIZE + chunk.len()].copy_from_slice(chunk);
        Self(buf)
    }

    /// The raw 32 bytes as written to the device.
    pub fn as_bytes(&self) -> &[u8; REPORT_SIZE] {
        &self.0
    }

    /// The command byte, if it is a known command.
    pub fn command(&self) -> Option<ReportCommand> {
        ReportCommand::try_from(self.0[1]).ok()
    }

    /// All 30 payload bytes, padding included.
    pub fn payload(&self) -> &[u8] {
        &self.0[REPORT_HEADER_SIZE..]
    }
}

impl std::fmt::Debug for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Report")
            .field("command", &self.command())
            .field("payload", &self.payload())
            .finish()
    }
}

// ── Encoding ─────────────────────────────────────────────────────

/// Split a frame into its ordered reports.
pub fn encode_frame(frame: &Framebuffer) -> Vec<Report> {
    frame
        .as_bytes()
        .chunks(PAYLOAD_SIZE)
        .enumerate()
        .map(|(idx, chunk)| {
            let command = if idx == 0 {
                ReportCommand::Start
            } else {
                ReportCommand::Data
            };
            Report::new(command, chunk)
        })
        .collect()
}

/// Streams frames to a [`HidChannel`] as 32-byte reports.
///
/// Keeps one scratch buffer so steady-state sends do not allocate.
#[derive(Debug, Default)]
pub struct ReportCodec {
    scratch: BytesMut,
}

impl ReportCodec {
    pub fn new() -> Self {
        Self {
            scratch: BytesMut::with_capacity(REPORTS_PER_FRAME * REPORT_SIZE),
        }
    }

    /// Encode and write one frame. Stops at the first failed or short
    /// write; the partial frame is abandoned.
    pub fn send_frame<C: HidChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        frame: &Framebuffer,
    ) -> Result<usize, MintakaError> {
        let mut buf = std::mem::take(&mut self.scratch);
        buf.clear();
        self.encode(frame, &mut buf)?;

        let result = Self::write_reports(channel, &buf);
        self.scratch = buf;
        result
    }

    fn write_reports<C: HidChannel + ?Sized>(
        channel: &mut C,
        buf: &[u8],
    ) -> Result<usize, MintakaError> {
        let mut sent = 0;
        for report in buf.chunks(REPORT_SIZE) {
            let n = channel.write(report)?;
            if n < report.len() {
                return Err(MintakaError::Transport(format!(
                    "short write: {n} of {} bytes",
                    report.len()
                )));
            }
            sent += 1;
        }
        trace!("sent frame as {sent} reports");
        Ok(sent)
    }
}

impl Encoder<&Framebuffer> for ReportCodec {
    type Error = MintakaError;

    fn encode(&mut self, frame: &Framebuffer, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(REPORTS_PER_FRAME * REPORT_SIZE);
        for report in encode_frame(frame) {
            dst.extend_from_slice(report.as_bytes());
        }
        Ok(())
    }
}

// ── Decoding ─────────────────────────────────────────────────────

/// Parse one inbound report. Returns `None` for anything that is not a
/// well-formed `SCREEN_REQ`.
pub fn decode_device_state(raw: &[u8]) -> Option<DeviceStateEvent> {
    match raw {
        [cmd, screen, layer, ..] if *cmd == ReportCommand::ScreenRequest as u8 => {
            Some(DeviceStateEvent::new(*screen, *layer))
        }
        _ => None,
    }
}

/// Wait up to `timeout_ms` for the next report, then drain whatever
/// else is already queued without waiting.
///
/// Only the last valid event is returned: while the encoder spins,
/// intermediate selections are dropped and only the resting position
/// matters.
pub fn poll_device_state<C: HidChannel + ?Sized>(
    channel: &mut C,
    timeout_ms: i32,
) -> Result<Option<DeviceStateEvent>, MintakaError> {
    let mut buf = [0u8; REPORT_SIZE];
    let mut latest = None;

    let n = channel.read_timeout(&mut buf, timeout_ms)?;
    if let Some(event) = decode_device_state(&buf[..n]) {
        latest = Some(event);
    }

    for _ in 0..MAX_DRAIN {
        let n = channel.read_timeout(&mut buf, 0)?;
        if n == 0 {
            break;
        }
        if let Some(event) = decode_device_state(&buf[..n]) {
            latest = Some(event);
        }
    }

    Ok(latest)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceIds, HidBackend, MockDevice};

    fn patterned_frame() -> Framebuffer {
        let bytes: Vec<u8> = (0..FRAMEBUFFER_SIZE).map(|i| (i * 7 + 3) as u8).collect();
        Framebuffer::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn frame_splits_into_35_reports() {
        assert_eq!(PAYLOAD_SIZE, 30);
        assert_eq!(REPORTS_PER_FRAME, 35);

        let frame = patterned_frame();
        let reports = encode_frame(&frame);
        assert_eq!(reports.len(), 35);

        assert_eq!(reports[0].command(), Some(ReportCommand::Start));
        assert!(
            reports[1..]
                .iter()
                .all(|r| r.command() == Some(ReportCommand::Data))
        );
        assert!(reports.iter().all(|r| r.as_bytes()[0] == REPORT_ID));
    }

    #[test]
    fn payloads_reassemble_exactly() {
        let frame = patterned_frame();
        let reports = encode_frame(&frame);

        let mut joined = Vec::new();
        for r in &reports[..34] {
            joined.extend_from_slice(r.payload());
        }
        // 1024 − 30 × 34 = 4 bytes in the last report.
        let last = reports[34].payload();
        joined.extend_from_slice(&last[..4]);
        assert!(last[4..].iter().all(|&b| b == 0));

        assert_eq!(joined.as_slice(), frame.as_bytes().as_slice());
    }

    #[test]
    fn codec_sends_every_report_in_order() {
        let mut dev = MockDevice::plugged();
        let mut ch = dev.open(&DeviceIds::default()).unwrap();
        let frame = patterned_frame();

        let mut codec = ReportCodec::new();
        assert_eq!(codec.send_frame(&mut ch, &frame).unwrap(), 35);
        // A second frame reuses the scratch buffer.
        assert_eq!(codec.send_frame(&mut ch, &frame).unwrap(), 35);

        let written = dev.written();
        assert_eq!(written.len(), 70);
        assert!(written.iter().all(|r| r.len() == REPORT_SIZE));
        let expected: Vec<Vec<u8>> = encode_frame(&frame)
            .iter()
            .map(|r| r.as_bytes().to_vec())
            .collect();
        assert_eq!(&written[..35], expected.as_slice());
        assert_eq!(written[35][1], ReportCommand::Start as u8);
    }

    #[test]
    fn send_aborts_on_write_failure() {
        let mut dev = MockDevice::plugged();
        let mut ch = dev.open(&DeviceIds::default()).unwrap();
        dev.fail_next_write();

        let mut codec = ReportCodec::new();
        let err = codec.send_frame(&mut ch, &Framebuffer::new()).unwrap_err();
        assert!(err.is_link_loss());
        assert!(dev.written().is_empty());
    }

    #[test]
    fn decode_accepts_only_screen_requests() {
        assert_eq!(
            decode_device_state(&[0x03, 2, 1]),
            Some(DeviceStateEvent::new(2, 1))
        );
        assert_eq!(
            decode_device_state(&[0x03, 4, 0, 0, 0, 0]),
            Some(DeviceStateEvent::new(4, 0))
        );
        assert_eq!(decode_device_state(&[0x03, 2]), None);
        assert_eq!(decode_device_state(&[0x01, 2, 1]), None);
        assert_eq!(decode_device_state(&[]), None);
    }

    #[test]
    fn poll_coalesces_to_last_event() {
        let mut dev = MockDevice::plugged();
        let mut ch = dev.open(&DeviceIds::default()).unwrap();
        dev.queue_state(2, 0);
        dev.queue_state(0, 1);
        dev.queue_state(3, 1);

        let event = poll_device_state(&mut ch, 250).unwrap();
        assert_eq!(event, Some(DeviceStateEvent::new(3, 1)));
        assert_eq!(poll_device_state(&mut ch, 0).unwrap(), None);
    }

    #[test]
    fn poll_blocks_once_then_drains_without_waiting() {
        let mut dev = MockDevice::plugged();
        let mut ch = dev.open(&DeviceIds::default()).unwrap();
        dev.queue_state(2, 0);
        dev.queue_state(0, 1);
        dev.queue_state(3, 1);

        poll_device_state(&mut ch, 250).unwrap();
        // One wait, two queued reports, one empty read ends the drain.
        assert_eq!(dev.read_timeouts(), vec![250, 0, 0, 0]);
    }

    #[test]
    fn poll_on_quiet_device_waits_then_checks_once() {
        let mut dev = MockDevice::plugged();
        let mut ch = dev.open(&DeviceIds::default()).unwrap();
        assert_eq!(poll_device_state(&mut ch, 250).unwrap(), None);
        assert_eq!(dev.read_timeouts(), vec![250, 0]);
    }

    #[test]
    fn drain_is_capped_on_a_flooding_device() {
        let mut dev = MockDevice::plugged();
        let mut ch = dev.open(&DeviceIds::default()).unwrap();
        dev.queue_state(1, 0);
        dev.flood_state(2, 5);

        let event = poll_device_state(&mut ch, 250).unwrap();
        assert_eq!(event, Some(DeviceStateEvent::new(2, 5)));

        let timeouts = dev.read_timeouts();
        assert_eq!(timeouts.len(), 1 + MAX_DRAIN);
        assert_eq!(timeouts[0], 250);
        assert!(timeouts[1..].iter().all(|&t| t == 0));
    }

    #[test]
    fn poll_skips_garbage_between_events() {
        let mut dev = MockDevice::plugged();
        let mut ch = dev.open(&DeviceIds::default()).unwrap();
        dev.queue_state(1, 0);
        dev.queue_raw(&[0xAA, 0xBB, 0xCC]);
        dev.queue_raw(&[0x03]);

        let event = poll_device_state(&mut ch, 0).unwrap();
        assert_eq!(event, Some(DeviceStateEvent::new(1, 0)));
    }

    #[test]
    fn poll_reports_read_failure() {
        let mut dev = MockDevice::plugged();
        let mut ch = dev.open(&DeviceIds::default()).unwrap();
        dev.unplug();
        assert!(poll_device_state(&mut ch, 0).is_err());
    }
}
