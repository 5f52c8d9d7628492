//! Host service: wires the device, screens and audio together.
//!
//! The multiplexer loop is blocking, so it runs on a blocking task.
//! Screens query external tools through the runtime handle captured
//! here.

use tokio::runtime::Handle;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use mintaka_core::{AnalyzerTask, ConnectionManager, HidApiBackend, MintakaError, Multiplexer};

use crate::config::HostConfig;
use crate::metrics::CommandRunner;
use crate::screens::{FontHandle, build_screens};

// ── HostError ────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error(transparent)]
    Core(#[from] MintakaError),

    #[error("unknown font {0:?} (expected one of 5x8, 6x10, 6x13)")]
    UnknownFont(String),

    #[error("display loop panicked: {0}")]
    Join(#[from] JoinError),
}

// ── HostService ──────────────────────────────────────────────────

/// The top-level host service.
pub struct HostService {
    config: HostConfig,
    token: CancellationToken,
}

impl HostService {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            token: CancellationToken::new(),
        }
    }

    /// Obtain a handle that stops the service from another task.
    pub fn stop_handle(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Run until stopped. Returns the number of frames sent.
    ///
    /// 1. Builds the screen set; the HID library is opened lazily.
    /// 2. Runs the multiplexer (connect, serve, reconnect).
    /// 3. Stops audio capture once the loop exits.
    pub async fn run(&self) -> Result<u64, HostError> {
        let font = FontHandle::by_name(&self.config.screens.font)
            .ok_or_else(|| HostError::UnknownFont(self.config.screens.font.clone()))?;
        let config = self.config.clone();
        let token = self.token.clone();
        let handle = Handle::current();

        let frames =
            tokio::task::spawn_blocking(move || run_display(config, font, handle, token)).await??;
        info!("host service stopped after {frames} frames");
        Ok(frames)
    }
}

fn run_display(
    config: HostConfig,
    font: FontHandle,
    handle: Handle,
    token: CancellationToken,
) -> Result<u64, HostError> {
    let backend = HidApiBackend::new();
    let manager = ConnectionManager::new(backend, config.device.ids());

    let runner = CommandRunner::new(handle, config.screens.command_timeout());
    let analyzer = if config.audio.enabled {
        Some(
            AnalyzerTask::new(config.audio.analyzer_config(), config.audio.device.clone())
                .with_parent(&token),
        )
    } else {
        info!("audio capture disabled; visualizer is synthetic");
        None
    };
    let screens = build_screens(&config.screens, runner, analyzer);

    let mut mux = Multiplexer::new(manager, screens, font, config.to_multiplexer_config())?;
    mux.run(&token);

    let frames = mux.frames_sent();
    for mut screen in mux.into_renderers() {
        screen.shutdown();
    }
    if !token.is_cancelled() {
        warn!("display loop exited without a stop request");
    }
    Ok(frames)
}
