//! # mintaka-core
//!
//! Host-side library for the Mintaka macropad's 128×64 OLED.
//!
//! This crate contains:
//! - **Framebuffer**: `Framebuffer`, a packed 1-bit bitmap that is also an
//!   `embedded-graphics` draw target
//! - **Codec**: `ReportCodec` and `poll_device_state` for the 32-byte HID
//!   report protocol
//! - **Device**: the `HidBackend`/`HidChannel` seam with a `hidapi` backend
//!   and a scripted `MockDevice`
//! - **State**: `ConnectionPhase` and the edge-triggered `ConnectionManager`
//! - **Multiplexer**: the poll → render → send control loop
//! - **Audio**: `SpectrumAnalyzer`, `AnalyzerTask` and `SyntheticBands`
//! - **Rate**: `RateEstimator` for counter → bytes/second
//! - **Error**: `MintakaError` — typed, `thiserror`-based error hierarchy

pub mod audio;
pub mod codec;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod message;
pub mod multiplexer;
pub mod rate;
pub mod renderer;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use audio::{
    AnalyzerConfig, AnalyzerTask, BAND_COUNT, BandLevels, SharedBands, SpectrumAnalyzer,
    SyntheticBands,
};
pub use codec::{
    REPORT_SIZE, REPORTS_PER_FRAME, ReportCodec, decode_device_state, encode_frame,
    poll_device_state,
};
pub use device::{DeviceIds, HidApiBackend, HidBackend, HidChannel, MockChannel, MockDevice};
pub use error::MintakaError;
pub use framebuffer::{DISPLAY_HEIGHT, DISPLAY_WIDTH, FRAMEBUFFER_SIZE, Framebuffer};
pub use message::{DeviceStateEvent, ReportCommand};
pub use multiplexer::{Multiplexer, MultiplexerConfig};
pub use rate::RateEstimator;
pub use renderer::Renderer;
pub use state::{ConnectionManager, ConnectionPhase, ConnectionStatus};
