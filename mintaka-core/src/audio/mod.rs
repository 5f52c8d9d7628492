//! Audio spectrum analysis for the media visualizer.
//!
//! ```text
//!  cpal input callback ──► SpectrumAnalyzer ──► SharedBands ◄── renderer
//!       (audio thread)        (per block)        (atomics)       (main loop)
//! ```
//!
//! The capture thread is the only writer; readers take a 16-element
//! snapshot without locking. When capture is unavailable the renderer
//! uses [`SyntheticBands`] instead, which yields the same snapshot shape.

mod analyzer;
mod capture;
mod synthetic;

pub use analyzer::{SpectrumAnalyzer, band_edges, hann_window};
pub use capture::AnalyzerTask;
pub use synthetic::SyntheticBands;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::error::MintakaError;

/// Number of visualizer bands.
pub const BAND_COUNT: usize = 16;

/// Lowest band edge in Hz.
pub const MIN_FREQUENCY_HZ: f32 = 30.0;

/// Floor for the auto-level ceiling.
pub const PEAK_FLOOR: f32 = 0.001;

/// One snapshot of band levels, each in `[0, 1]`.
pub type BandLevels = [f32; BAND_COUNT];

// ── AnalyzerConfig ───────────────────────────────────────────────

/// Capture parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per analysis block (FFT size).
    pub block_size: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 2048,
        }
    }
}

impl AnalyzerConfig {
    /// Reject rates whose Nyquist frequency is below the lowest band
    /// edge, and blocks too small to resolve any band.
    pub fn validate(&self) -> Result<(), MintakaError> {
        if (self.sample_rate as f32) / 2.0 <= MIN_FREQUENCY_HZ * 2.0 {
            return Err(MintakaError::InvalidAudioConfig(format!(
                "sample rate {} Hz is too low",
                self.sample_rate
            )));
        }
        if !(64..=65_536).contains(&self.block_size) {
            return Err(MintakaError::InvalidAudioConfig(format!(
                "block size {} outside 64..=65536",
                self.block_size
            )));
        }
        Ok(())
    }

    /// Frequency of FFT bin `k`.
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / self.block_size as f32
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }
}

// ── SharedBands ──────────────────────────────────────────────────

struct BandsInner {
    levels: [AtomicU32; BAND_COUNT],
    peak: AtomicU32,
    live: AtomicBool,
    failed: AtomicBool,
}

/// Lock-free band levels shared between the capture thread and the
/// renderer. Levels are stored as `f32` bit patterns; a reader may see
/// a mix of two consecutive blocks, which is harmless for a visualizer.
#[derive(Clone)]
pub struct SharedBands {
    inner: Arc<BandsInner>,
}

impl SharedBands {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BandsInner {
                levels: [const { AtomicU32::new(0) }; BAND_COUNT],
                peak: AtomicU32::new(PEAK_FLOOR.to_bits()),
                live: AtomicBool::new(false),
                failed: AtomicBool::new(false),
            }),
        }
    }

    /// Current levels, each in `[0, 1]`.
    pub fn snapshot(&self) -> BandLevels {
        std::array::from_fn(|i| f32::from_bits(self.inner.levels[i].load(Ordering::Relaxed)))
    }

    /// Current auto-level ceiling.
    pub fn peak(&self) -> f32 {
        f32::from_bits(self.inner.peak.load(Ordering::Relaxed))
    }

    pub(crate) fn store(&self, levels: &BandLevels, peak: f32) {
        for (slot, level) in self.inner.levels.iter().zip(levels) {
            slot.store(level.to_bits(), Ordering::Relaxed);
        }
        self.inner.peak.store(peak.to_bits(), Ordering::Relaxed);
    }

    /// `true` while a capture stream is delivering blocks.
    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::Acquire) && !self.is_failed()
    }

    /// `true` once capture has failed; sticky.
    pub fn is_failed(&self) -> bool {
        self.inner.failed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_live(&self) {
        self.inner.live.store(true, Ordering::Release);
    }

    pub(crate) fn mark_failed(&self) {
        self.inner.failed.store(true, Ordering::Release);
    }
}

impl Default for SharedBands {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedBands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBands")
            .field("levels", &self.snapshot())
            .field("peak", &self.peak())
            .field("live", &self.is_live())
            .field("failed", &self.is_failed())
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────
