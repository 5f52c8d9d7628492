//! Screen multiplexer: the main control loop.
//!
//! ```text
//!   ┌──────────── connect (ConnectionManager) ◄──────────────┐
//!   ▼                                                        │
//!   poll state (≤ poll timeout) → render screen → send frame ─┤ ok: repeat
//!                                                            │ err: link lost
//!   not found: sleep reconnect delay ────────────────────────┘
//! ```
//!
//! The poll timeout is the loop's pacing clock. Everything here is
//! blocking; async callers run [`Multiplexer::run`] on a blocking task.

use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::codec::{ReportCodec, poll_device_state};
use crate::device::HidBackend;
use crate::error::MintakaError;
use crate::message::DeviceStateEvent;
use crate::renderer::Renderer;
use crate::state::{ConnectionManager, DEFAULT_RECONNECT_DELAY};

/// Granularity of cancellable sleeps.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

// ── MultiplexerConfig ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiplexerConfig {
    /// How long one poll waits for a device-state report.
    pub poll_timeout: Duration,
    /// Delay between failed connection attempts.
    pub reconnect_delay: Duration,
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(250),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl MultiplexerConfig {
    fn poll_timeout_ms(&self) -> i32 {
        i32::try_from(self.poll_timeout.as_millis()).unwrap_or(i32::MAX)
    }
}

// ── Multiplexer ──────────────────────────────────────────────────

/// Picks a renderer from the device's reported screen index and
/// streams its frames.
pub struct Multiplexer<B: HidBackend, R: Renderer> {
    manager: ConnectionManager<B>,
    renderers: Vec<R>,
    font: R::Font,
    codec: ReportCodec,
    config: MultiplexerConfig,
    current_screen: usize,
    current_layer: u8,
    frames_sent: u64,
}

impl<B: HidBackend, R: Renderer> Multiplexer<B, R> {
    /// Screen 0 and layer 0 are active until the device says otherwise.
    pub fn new(
        manager: ConnectionManager<B>,
        renderers: Vec<R>,
        font: R::Font,
        config: MultiplexerConfig,
    ) -> Result<Self, MintakaError> {
        if renderers.is_empty() {
            return Err(MintakaError::Other("no screens registered".into()));
        }
        let manager = manager.with_reconnect_delay(config.reconnect_delay);
        Ok(Self {
            manager,
            renderers,
            font,
            codec: ReportCodec::new(),
            config,
            current_screen: 0,
            current_layer: 0,
            frames_sent: 0,
        })
    }

    pub fn current_screen(&self) -> usize {
        self.current_screen
    }

    pub fn current_layer(&self) -> u8 {
        self.current_layer
    }

    pub fn screen_count(&self) -> usize {
        self.renderers.len()
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn manager_mut(&mut self) -> &mut ConnectionManager<B> {
        &mut self.manager
    }

    pub fn renderers(&self) -> &[R] {
        &self.renderers
    }

    /// Hand the renderers back, e.g. to release their resources.
    pub fn into_renderers(self) -> Vec<R> {
        self.renderers
    }

    /// Apply a device report. Unknown screen indices keep the current
    /// screen; the layer is always taken.
    pub fn apply_event(&mut self, event: DeviceStateEvent) {
        let screen = usize::from(event.screen);
        if screen < self.renderers.len() {
            if screen != self.current_screen {
                debug!("switching to screen {screen}");
            }
            self.current_screen = screen;
        } else {
            debug!("ignoring unknown screen {screen}");
        }
        self.current_layer = event.layer;
    }

    /// One iteration: poll, render, send.
    pub fn tick(&mut self, channel: &mut B::Channel) -> Result<(), MintakaError> {
        if let Some(event) = poll_device_state(channel, self.config.poll_timeout_ms())? {
            trace!("device state {event}");
            self.apply_event(event);
        }

        let frame = self.renderers[self.current_screen].render(&self.font, self.current_layer);
        self.codec.send_frame(channel, &frame)?;
        self.frames_sent += 1;
        Ok(())
    }

    /// Connect, serve, reconnect, until `token` is cancelled.
    pub fn run(&mut self, token: &CancellationToken) {
        info!(
            "multiplexer started with {} screens, looking for {}",
            self.renderers.len(),
            self.manager.ids()
        );

        while !token.is_cancelled() {
            match self.manager.connect() {
                Ok(mut channel) => self.serve(&mut channel, token),
                Err(e) => {
                    debug!("connect attempt failed: {e}");
                    sleep_cancellable(self.manager.reconnect_delay(), token);
                }
            }
        }

        info!("multiplexer stopped after {} frames", self.frames_sent);
    }

    /// Drive one connected session until a transport error or cancel.
    fn serve(&mut self, channel: &mut B::Channel, token: &CancellationToken) {
        while !token.is_cancelled() {
            self.manager.publish_status();
            if let Err(e) = self.tick(channel) {
                self.manager.mark_disconnected(&e);
                return;
            }
        }
    }
}

/// Sleep for `total`, waking early on cancellation.
fn sleep_cancellable(total: Duration, token: &CancellationToken) {
    let deadline = Instant::now() + total;
    while !token.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::REPORTS_PER_FRAME;
    use crate::device::{DeviceIds, MockDevice};
    use crate::framebuffer::Framebuffer;

    /// Lights pixel (index, layer) so frames identify their source.
    struct Marker(u8);

    impl Renderer for Marker {
        type Font = ();

        fn render(&mut self, _font: &(), layer: u8) -> Framebuffer {
            let mut fb = Framebuffer::new();
            fb.set_pixel(usize::from(self.0), usize::from(layer), true);
            fb
        }
    }

    fn mux(dev: &MockDevice) -> Multiplexer<MockDevice, Marker> {
        let manager = ConnectionManager::new(dev.clone(), DeviceIds::default());
        let config = MultiplexerConfig {
            poll_timeout: Duration::ZERO,
            reconnect_delay: Duration::ZERO,
        };
        Multiplexer::new(manager, (0..4).map(Marker).collect(), (), config).unwrap()
    }

    #[test]
    fn starts_on_screen_zero_layer_zero() {
        let m = mux(&MockDevice::new());
        assert_eq!(m.current_screen(), 0);
        assert_eq!(m.current_layer(), 0);
        assert_eq!(m.screen_count(), 4);
    }

    #[test]
    fn empty_renderer_set_rejected() {
        let manager = ConnectionManager::new(MockDevice::new(), DeviceIds::default());
        let result: Result<Multiplexer<_, Marker>, _> =
            Multiplexer::new(manager, Vec::new(), (), MultiplexerConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_screen_keeps_current_but_takes_layer() {
        let mut m = mux(&MockDevice::new());
        m.apply_event(DeviceStateEvent::new(2, 0));
        m.apply_event(DeviceStateEvent::new(99, 1));
        assert_eq!(m.current_screen(), 2);
        assert_eq!(m.current_layer(), 1);
        m.apply_event(DeviceStateEvent::new(4, 0));
        assert_eq!(m.current_screen(), 2);
    }

    #[test]
    fn tick_renders_selected_screen() {
        let dev = MockDevice::plugged();
        let mut m = mux(&dev);
        let mut ch = m.manager_mut().connect().unwrap();

        dev.queue_state(3, 1);
        m.tick(&mut ch).unwrap();

        let written = dev.take_written();
        assert_eq!(written.len(), REPORTS_PER_FRAME);
        // Pixel (3, 1) is bit 0x80 >> 3 of byte 16, the 17th payload
        // byte of the first report.
        assert_eq!(written[0][2 + 16], 0x10);
        assert_eq!(m.frames_sent(), 1);
    }

    #[test]
    fn tick_surfaces_write_failure() {
        let dev = MockDevice::plugged();
        let mut m = mux(&dev);
        let mut ch = m.manager_mut().connect().unwrap();
        dev.fail_next_write();
        assert!(m.tick(&mut ch).is_err());
        assert_eq!(m.frames_sent(), 0);
    }

    #[test]
    fn run_returns_when_cancelled_while_disconnected() {
        let dev = MockDevice::new();
        let mut m = mux(&dev);
        let token = CancellationToken::new();
        token.cancel();
        m.run(&token);
        assert_eq!(dev.open_count(), 0);
    }

    #[test]
    fn cancellable_sleep_wakes_early() {
        let token = CancellationToken::new();
        token.cancel();
        let start = Instant::now();
        sleep_cancellable(Duration::from_secs(10), &token);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
