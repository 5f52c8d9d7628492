//! Background audio capture feeding a [`SpectrumAnalyzer`].
//!
//! A dedicated thread owns the cpal input stream (streams are not
//! `Send` on every host) and parks on a [`CancellationToken`] until
//! shutdown. Any failure marks the shared bands as failed so the
//! visualizer can switch to its synthetic fallback.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{AnalyzerConfig, SharedBands, SpectrumAnalyzer};
use crate::error::MintakaError;

enum TaskState {
    Idle,
    Running(JoinHandle<()>),
    Failed,
    Stopped,
}

/// Owns the capture thread. Starting is lazy and idempotent; a failed
/// start is not retried.
pub struct AnalyzerTask {
    config: AnalyzerConfig,
    device_name: Option<String>,
    bands: SharedBands,
    token: CancellationToken,
    state: TaskState,
}

impl AnalyzerTask {
    /// `device_name` selects the first input device whose name contains
    /// it; `None` uses the host's default input.
    pub fn new(config: AnalyzerConfig, device_name: Option<String>) -> Self {
        Self {
            config,
            device_name,
            bands: SharedBands::new(),
            token: CancellationToken::new(),
            state: TaskState::Idle,
        }
    }

    /// Tie the task to an outer token so a process-wide cancel stops it.
    pub fn with_parent(mut self, parent: &CancellationToken) -> Self {
        self.token = parent.child_token();
        self
    }

    /// Handle for readers.
    pub fn bands(&self) -> SharedBands {
        self.bands.clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(&self.state, TaskState::Running(h) if !h.is_finished())
    }

    pub fn has_failed(&self) -> bool {
        matches!(self.state, TaskState::Failed) || self.bands.is_failed()
    }

    /// Open the input stream on a background thread. Returns once the
    /// stream is playing or has failed to start.
    pub fn start(&mut self) -> Result<(), MintakaError> {
        if !matches!(self.state, TaskState::Idle) {
            return Ok(());
        }
        if let Err(e) = self.config.validate() {
            self.fail();
            return Err(e);
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let config = self.config;
        let device_name = self.device_name.clone();
        let bands = self.bands.clone();
        let token = self.token.clone();

        let spawned = thread::Builder::new()
            .name("mintaka-audio".into())
            .spawn(move || {
                let stream = match open_stream(config, device_name.as_deref(), bands.clone()) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                bands.mark_live();
                let _ = ready_tx.send(Ok(()));

                futures::executor::block_on(token.cancelled());
                drop(stream);
                debug!("audio capture stopped");
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.fail();
                return Err(MintakaError::AudioCapture(format!("spawn capture thread: {e}")));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!(
                    "audio capture running ({} Hz, {} samples/block)",
                    self.config.sample_rate, self.config.block_size
                );
                self.state = TaskState::Running(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                self.fail();
                warn!("audio capture unavailable: {e}");
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                self.fail();
                Err(MintakaError::AudioCapture("capture thread exited early".into()))
            }
        }
    }

    /// Stop the stream and join the thread.
    pub fn shutdown(&mut self) {
        self.token.cancel();
        if let TaskState::Running(handle) = std::mem::replace(&mut self.state, TaskState::Stopped)
        {
            if handle.join().is_err() {
                warn!("audio capture thread panicked");
            }
        }
    }

    fn fail(&mut self) {
        self.bands.mark_failed();
        self.state = TaskState::Failed;
    }
}

impl Drop for AnalyzerTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

// ── Stream setup ─────────────────────────────────────────────────

fn open_stream(
    config: AnalyzerConfig,
    device_name: Option<&str>,
    bands: SharedBands,
) -> Result<cpal::Stream, MintakaError> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(wanted) => host
            .input_devices()
            .map_err(|e| MintakaError::AudioCapture(format!("list input devices: {e}")))?
            .find(|d| d.name().is_ok_and(|n| n.contains(wanted)))
            .ok_or_else(|| MintakaError::AudioCapture(format!("no input device matching {wanted:?}")))?,
        None => host
            .default_input_device()
            .ok_or_else(|| MintakaError::AudioCapture("no default input device".into()))?,
    };

    let supported = device
        .default_input_config()
        .map_err(|e| MintakaError::AudioCapture(format!("query input config: {e}")))?;
    let channels = supported.channels().max(1);
    let stream_config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    debug!(
        "opening {} ({} ch, {:?})",
        device.name().unwrap_or_else(|_| "unknown".into()),
        channels,
        supported.sample_format()
    );

    let analyzer = SpectrumAnalyzer::new(config, bands.clone())?;
    let stream = match supported.sample_format() {
        SampleFormat::F32 => build::<f32>(&device, &stream_config, analyzer, bands),
        SampleFormat::I16 => build::<i16>(&device, &stream_config, analyzer, bands),
        SampleFormat::U16 => build::<u16>(&device, &stream_config, analyzer, bands),
        other => Err(MintakaError::AudioCapture(format!(
            "unsupported sample format {other:?}"
        ))),
    }?;

    stream
        .play()
        .map_err(|e| MintakaError::AudioCapture(format!("start stream: {e}")))?;
    Ok(stream)
}

/// Build an input stream that takes the first channel of each frame
/// and analyzes it in fixed-size blocks.
fn build<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    mut analyzer: SpectrumAnalyzer,
    bands: SharedBands,
) -> Result<cpal::Stream, MintakaError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = stream_config.channels as usize;
    let block_size = analyzer.config().block_size;
    let mut block = Vec::with_capacity(block_size);

    device
        .build_input_stream(
            stream_config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    block.push(f32::from_sample(frame[0]));
                    if block.len() == block_size {
                        if let Err(e) = analyzer.process_block(&block) {
                            debug!("dropped audio block: {e}");
                        }
                        block.clear();
                    }
                }
            },
            move |err| {
                warn!("audio stream error: {err}");
                bands.mark_failed();
            },
            None,
        )
        .map_err(|e| MintakaError::AudioCapture(format!("build stream: {e}")))
}

// ── Tests ────────────────────────────────────────────────────────
