//! Configuration for the Mintaka host service.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mintaka_core::{AnalyzerConfig, DeviceIds, MultiplexerConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Which HID interface to drive and how often to poll it.
    pub device: DeviceConfig,
    /// Audio capture for the visualizer.
    pub audio: AudioConfig,
    /// Screen content.
    pub screens: ScreensConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Device identification and loop pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: u16,
    pub usage: u16,
    /// How long each poll waits for an encoder/layer report.
    pub poll_timeout_ms: u64,
    /// Delay between connection attempts while the device is absent.
    pub reconnect_delay_ms: u64,
}

/// Audio capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Use live capture; when off the visualizer is synthetic.
    pub enabled: bool,
    pub sample_rate: u32,
    /// Samples per FFT block.
    pub block_size: usize,
    /// Substring of the input device name (e.g. a monitor source).
    /// Unset means the default input device.
    pub device: Option<String>,
}

/// Screen settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreensConfig {
    /// Mono font: "5x8", "6x10" or "6x13".
    pub font: String,
    /// MPRIS player name passed to `playerctl -p`.
    pub media_player: String,
    /// Look up the public address for the IO screen.
    pub public_ip: bool,
    /// How long GPU query results are reused.
    pub gpu_cache_ms: u64,
    /// Timeout for each external command.
    pub command_timeout_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for DeviceConfig {
    fn default() -> Self {
        let ids = DeviceIds::default();
        Self {
            vendor_id: ids.vendor_id,
            product_id: ids.product_id,
            usage_page: ids.usage_page,
            usage: ids.usage,
            poll_timeout_ms: 250,
            reconnect_delay_ms: 1000,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        let analyzer = AnalyzerConfig::default();
        Self {
            enabled: true,
            sample_rate: analyzer.sample_rate,
            block_size: analyzer.block_size,
            device: None,
        }
    }
}

impl Default for ScreensConfig {
    fn default() -> Self {
        Self {
            font: "5x8".into(),
            media_player: "spotify".into(),
            public_ip: true,
            gpu_cache_ms: 500,
            command_timeout_ms: 2000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

/// Where the loaded configuration came from. Logging is not set up
/// until the configuration is known, so the caller reports this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Missing,
    Invalid(String),
}

impl ConfigSource {
    pub fn log(&self, path: &Path) {
        match self {
            Self::File => tracing::info!("loaded config from {}", path.display()),
            Self::Missing => tracing::info!("no config at {}; using defaults", path.display()),
            Self::Invalid(e) => {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display())
            }
        }
    }
}

impl HostConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> (Self, ConfigSource) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, ConfigSource::File),
                Err(e) => (Self::default(), ConfigSource::Invalid(e.to_string())),
            },
            Err(_) => (Self::default(), ConfigSource::Missing),
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Loop settings for the multiplexer. The poll timeout is the
    /// frame pacing, so it is kept within 50..=1000 ms.
    pub fn to_multiplexer_config(&self) -> MultiplexerConfig {
        MultiplexerConfig {
            poll_timeout: Duration::from_millis(self.device.poll_timeout_ms.clamp(50, 1000)),
            reconnect_delay: Duration::from_millis(self.device.reconnect_delay_ms),
        }
    }
}

impl DeviceConfig {
    pub fn ids(&self) -> DeviceIds {
        DeviceIds::new(self.vendor_id, self.product_id, self.usage_page, self.usage)
    }
}

impl AudioConfig {
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            sample_rate: self.sample_rate,
            block_size: self.block_size,
        }
    }
}

impl ScreensConfig {
    pub fn gpu_cache(&self) -> Duration {
        Duration::from_millis(self.gpu_cache_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }
}

// ── Tests ────────────────────────────────────────────────────────
