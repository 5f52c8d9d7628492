//! Rolling-window rate estimator for monotonically increasing counters.
//!
//! Network and disk byte counters only ever grow; the screens want
//! bytes/second. Each tick records `(now, counter)` and the rate is the
//! counter delta across the retained window divided by its time span.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default window length.
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(1);

/// Rolling-window rate estimator for one counter.
pub struct RateEstimator {
    /// Samples: `(when, counter value)`, oldest first.
    samples: VecDeque<(Instant, u64)>,
    /// Window duration.
    window: Duration,
}

impl RateEstimator {
    /// Create an estimator with a 1-second rolling window.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_RATE_WINDOW)
    }

    /// Create an estimator with a custom window duration.
    pub fn with_window(window: Duration) -> Self {
        Self {
            samples: VecDeque::with_capacity(16),
            window,
        }
    }

    /// Record the counter at the current instant and return the rate.
    pub fn record(&mut self, value: u64) -> f64 {
        self.record_at(Instant::now(), value)
    }

    /// Record with an explicit timestamp (useful for testing).
    ///
    /// A value lower than the previous one (counter wrap, interface
    /// reset) restarts the window from this sample and yields 0.
    pub fn record_at(&mut self, now: Instant, value: u64) -> f64 {
        if let Some(&(_, last)) = self.samples.back() {
            if value < last {
                self.samples.clear();
            }
        }
        self.samples.push_back((now, value));
        self.evict(now);
        self.rate_at(now)
    }

    /// Rate over the retained window, measured up to the newest sample.
    pub fn rate(&self) -> f64 {
        match self.samples.back() {
            Some(&(latest, _)) => self.rate_at(latest),
            None => 0.0,
        }
    }

    /// Number of samples currently in the window.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    // ── Internal ─────────────────────────────────────────────────

    fn rate_at(&self, now: Instant) -> f64 {
        let (Some(&(oldest_ts, oldest)), Some(&(_, latest))) =
            (self.samples.front(), self.samples.back())
        else {
            return 0.0;
        };
        let elapsed = now.saturating_duration_since(oldest_ts);
        if elapsed.is_zero() {
            return 0.0;
        }
        latest.saturating_sub(oldest) as f64 / elapsed.as_secs_f64()
    }

    fn evict(&mut self, now: Instant) {
        while let Some(&(ts, _)) = self.samples.front() {
            if now.saturating_duration_since(ts) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────
