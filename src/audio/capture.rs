use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource,
};

/// Format of a capture stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
        }
    }
}

/// An open capture stream. Consumed by `close_capture`.
#[derive(Debug)]
pub struct CaptureHandle {
    id: u64,
    destination: PathBuf,
}

impl CaptureHandle {
    pub fn new(id: u64, destination: PathBuf) -> Self {
        Self { id, destination }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

/// Audio capture device and file writer
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Open a capture stream writing to `destination`
    async fn open_capture(
        &self,
        config: &CaptureConfig,
        destination: &Path,
    ) -> Result<CaptureHandle>;

    /// Close the stream and return the path of the finished recording
    async fn close_capture(&self, handle: CaptureHandle) -> Result<PathBuf>;

    /// Device name for logging
    fn name(&self) -> &str;
}

struct ActiveCapture {
    backend: Box<dyn AudioBackend>,
    writer: JoinHandle<Result<PathBuf>>,
}

/// Captures frames from an `AudioBackend` into 16-bit PCM WAV files
pub struct WavCaptureDevice {
    source: AudioSource,
    buffer_duration_ms: u64,
    next_id: AtomicU64,
    active: Mutex<HashMap<u64, ActiveCapture>>,
}

impl WavCaptureDevice {
    pub fn new(source: AudioSource) -> Self {
        Self {
            source,
            buffer_duration_ms: AudioBackendConfig::default().buffer_duration_ms,
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_buffer_duration_ms(mut self, buffer_duration_ms: u64) -> Self {
        self.buffer_duration_ms = buffer_duration_ms;
        self
    }
}

#[async_trait::async_trait]
impl CaptureDevice for WavCaptureDevice {
    async fn open_capture(
        &self,
        config: &CaptureConfig,
        destination: &Path,
    ) -> Result<CaptureHandle> {
        if config.bits_per_sample != 16 {
            bail!("Unsupported bit depth: {} (only 16-bit PCM)", config.bits_per_sample);
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| {
                    format!("Failed to create recordings directory: {}", parent.display())
                })?;
        }

        let writer = TakeWriter::create(destination.to_path_buf(), config)?;

        let mut backend = AudioBackendFactory::create(
            self.source.clone(),
            AudioBackendConfig {
                target_sample_rate: config.sample_rate,
                target_channels: config.channels,
                buffer_duration_ms: self.buffer_duration_ms,
            },
        )
        .context("Failed to create audio backend")?;

        let frames = backend
            .start()
            .await
            .with_context(|| format!("Failed to start {}", backend.name()))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let writer = tokio::spawn(writer.record(frames));

        self.active
            .lock()
            .await
            .insert(id, ActiveCapture { backend, writer });

        info!("Capture {} opened: {}", id, destination.display());

        Ok(CaptureHandle::new(id, destination.to_path_buf()))
    }

    async fn close_capture(&self, handle: CaptureHandle) -> Result<PathBuf> {
        let capture = self
            .active
            .lock()
            .await
            .remove(&handle.id)
            .with_context(|| format!("Unknown capture handle {}", handle.id))?;

        let ActiveCapture { mut backend, writer } = capture;
        let stopped = backend.stop().await;

        // Writer drains whatever frames are buffered, then finalizes the file
        let path = writer.await.context("Capture writer task panicked")??;
        stopped.context("Failed to stop audio backend")?;

        info!("Capture {} closed: {}", handle.id, path.display());

        Ok(path)
    }

    fn name(&self) -> &str {
        "wav capture"
    }
}

/// Writes one take to disk as a WAV file
struct TakeWriter {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    channels: u16,
    sample_count: usize,
    /// Capture clock of the newest frame written
    last_timestamp_ms: Option<u64>,
}

impl TakeWriter {
    fn create(path: PathBuf, config: &CaptureConfig) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: config.channels,
            sample_rate: config.sample_rate,
            bits_per_sample: config.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        Ok(Self {
            writer: Some(writer),
            path,
            channels: config.channels,
            sample_count: 0,
            last_timestamp_ms: None,
        })
    }

    async fn record(mut self, mut frames: mpsc::Receiver<AudioFrame>) -> Result<PathBuf> {
        while let Some(frame) = frames.recv().await {
            self.write_frame(&frame)?;
        }
        self.finish()
    }

    fn write_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        if frame.channels != self.channels {
            bail!(
                "Frame has {} channels, take is {} channels",
                frame.channels,
                self.channels
            );
        }
        if let Some(last) = self.last_timestamp_ms {
            if frame.timestamp_ms < last {
                bail!(
                    "Frame at {}ms arrived after frame at {}ms",
                    frame.timestamp_ms,
                    last
                );
            }
        }

        if let Some(writer) = &mut self.writer {
            for &sample in &frame.samples {
                writer.write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            self.sample_count += frame.samples.len();
            self.last_timestamp_ms = Some(frame.timestamp_ms);
        }

        Ok(())
    }

    fn finish(mut self) -> Result<PathBuf> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()
                .context("Failed to finalize WAV file")?;
        }

        info!(
            "Take written: {} ({} samples, last frame at {}ms)",
            self.path.display(),
            self.sample_count,
            self.last_timestamp_ms.unwrap_or_default()
        );

        Ok(self.path.clone())
    }
}

impl Drop for TakeWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
