//! Random-walk bands used when no audio capture is available.

use rand::Rng;
use rand::rngs::ThreadRng;

use super::{BAND_COUNT, BandLevels};

/// Bar height in pixels; levels are exposed as `pixels / BAR_PIXELS`.
const BAR_PIXELS: f32 = 12.0;
const MIN_TARGET: f32 = 2.0;
const MIN_PIXELS: f32 = 1.0;
const DRIFT: f32 = 0.5;
const IDLE_DECAY: f32 = 0.8;

/// Fake spectrum: bars chase random targets while playing and sink
/// towards one pixel otherwise.
#[derive(Debug)]
pub struct SyntheticBands<R = ThreadRng> {
    /// Bar heights in pixels.
    bars: [f32; BAND_COUNT],
    rng: R,
}

impl SyntheticBands<ThreadRng> {
    pub fn new() -> Self {
        Self::with_rng(rand::thread_rng())
    }
}

impl Default for SyntheticBands<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> SyntheticBands<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            bars: [0.0; BAND_COUNT],
            rng,
        }
    }

    /// Advance one refresh and return the new levels.
    pub fn advance(&mut self, playing: bool) -> BandLevels {
        for bar in &mut self.bars {
            if playing {
                let target = self.rng.gen_range(MIN_TARGET..=BAR_PIXELS);
                *bar += (target - *bar) * DRIFT;
            } else {
                *bar = (*bar * IDLE_DECAY).max(MIN_PIXELS);
            }
        }
        self.levels()
    }

    /// Current levels in `[0, 1]`.
    pub fn levels(&self) -> BandLevels {
        std::array::from_fn(|i| (self.bars[i] / BAR_PIXELS).clamp(0.0, 1.0))
    }

    /// Drop every bar to zero (nothing is playing).
    pub fn reset(&mut self) {
        self.bars = [0.0; BAND_COUNT];
    }
}

// ── Tests ────────────────────────────────────────────────────────
