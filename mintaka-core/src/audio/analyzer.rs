//! FFT band extraction with auto-leveling and attack/decay smoothing.

use std::f32::consts::PI;
use std::ops::Range;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::{AnalyzerConfig, BAND_COUNT, BandLevels, MIN_FREQUENCY_HZ, PEAK_FLOOR, SharedBands};
use crate::error::MintakaError;

/// Per-block decay applied to the auto-level ceiling.
const PEAK_DECAY: f32 = 0.995;

/// Weight kept from the previous level when a band falls.
const FALL_RETAIN: f32 = 0.75;

/// Hann window coefficient for sample `index` of `size`.
pub fn hann_window(index: usize, size: usize) -> f32 {
    if size < 2 {
        return 1.0;
    }
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

/// 17 log-spaced edges from 30 Hz to Nyquist.
pub fn band_edges(config: &AnalyzerConfig) -> [f32; BAND_COUNT + 1] {
    let ratio = config.nyquist() / MIN_FREQUENCY_HZ;
    let mut edges: [f32; BAND_COUNT + 1] =
        std::array::from_fn(|i| MIN_FREQUENCY_HZ * ratio.powf(i as f32 / BAND_COUNT as f32));
    // Pin the endpoints against powf rounding.
    edges[0] = MIN_FREQUENCY_HZ;
    edges[BAND_COUNT] = config.nyquist();
    edges
}

/// Turns blocks of mono samples into 16 band levels in `[0, 1]`.
///
/// Each processed block is published to the [`SharedBands`] handed in
/// at construction.
pub struct SpectrumAnalyzer {
    config: AnalyzerConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    /// Bin range per band; bin k is in band i when
    /// `edge[i] <= f_k < edge[i + 1]`.
    band_bins: [Range<usize>; BAND_COUNT],
    levels: BandLevels,
    peak: f32,
    output: SharedBands,
}

impl SpectrumAnalyzer {
    pub fn new(config: AnalyzerConfig, output: SharedBands) -> Result<Self, MintakaError> {
        config.validate()?;
        let n = config.block_size;

        let fft = FftPlanner::new().plan_fft_forward(n);
        let window = (0..n).map(|i| hann_window(i, n)).collect();

        let edges = band_edges(&config);
        let bins = n / 2 + 1;
        let first_bin_at = |freq: f32| {
            (0..bins)
                .find(|&k| config.bin_frequency(k) >= freq)
                .unwrap_or(bins)
        };
        let band_bins = std::array::from_fn(|i| first_bin_at(edges[i])..first_bin_at(edges[i + 1]));

        Ok(Self {
            config,
            fft,
            window,
            spectrum: vec![Complex::new(0.0, 0.0); n],
            band_bins,
            levels: [0.0; BAND_COUNT],
            peak: PEAK_FLOOR,
            output,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Smoothed levels after the last block.
    pub fn levels(&self) -> &BandLevels {
        &self.levels
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Number of FFT bins assigned to each band.
    pub fn bins_per_band(&self) -> [usize; BAND_COUNT] {
        std::array::from_fn(|i| self.band_bins[i].len())
    }

    /// Analyze one block of exactly `block_size` samples.
    pub fn process_block(&mut self, block: &[f32]) -> Result<&BandLevels, MintakaError> {
        if block.len() != self.config.block_size {
            return Err(MintakaError::AudioCapture(format!(
                "block of {} samples, expected {}",
                block.len(),
                self.config.block_size
            )));
        }

        for ((slot, &sample), &w) in self.spectrum.iter_mut().zip(block).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.spectrum);

        let raw: BandLevels =
            std::array::from_fn(|i| band_magnitude(&self.spectrum[self.band_bins[i].clone()]));

        let loudest = raw.iter().copied().fold(0.0_f32, f32::max);
        self.peak = (self.peak * PEAK_DECAY).max(loudest).max(PEAK_FLOOR);

        for (level, &value) in self.levels.iter_mut().zip(&raw) {
            let target = (value / self.peak).min(1.0);
            *level = if target > *level {
                target
            } else {
                *level * FALL_RETAIN + target * (1.0 - FALL_RETAIN)
            };
        }

        self.output.store(&self.levels, self.peak);
        Ok(&self.levels)
    }
}

/// Mean magnitude of a band's bins; empty bands are silent.
fn band_magnitude(bins: &[Complex<f32>]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    bins.iter().map(|c| c.norm()).sum::<f32>() / bins.len() as f32
}

// ── Tests ────────────────────────────────────────────────────────
