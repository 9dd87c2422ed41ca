// Frame sources that stand in for a live microphone

use anyhow::{bail, Result};
use std::f32::consts::TAU;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::file::AudioFile;

const FRAME_CHANNEL_CAPACITY: usize = 32;
const TONE_AMPLITUDE: f32 = 0.25;

fn samples_per_buffer(config: &AudioBackendConfig) -> usize {
    (config.target_sample_rate as u64 * config.buffer_duration_ms / 1000).max(1) as usize
}

fn validate(config: &AudioBackendConfig) -> Result<()> {
    if config.target_sample_rate == 0 || config.target_channels == 0 {
        bail!(
            "Invalid backend format: {}Hz, {} channels",
            config.target_sample_rate,
            config.target_channels
        );
    }
    if config.buffer_duration_ms == 0 {
        bail!("Buffer duration must be at least 1ms");
    }
    Ok(())
}

/// Sine tone generator emitting frames in real time
pub struct ToneBackend {
    config: AudioBackendConfig,
    frequency_hz: f32,
    task: Option<JoinHandle<()>>,
}

impl ToneBackend {
    pub fn new(config: AudioBackendConfig, frequency_hz: f32) -> Result<Self> {
        validate(&config)?;
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            bail!("Tone frequency must be positive, got {}", frequency_hz);
        }

        Ok(Self {
            config,
            frequency_hz,
            task: None,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for ToneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.task.is_some() {
            bail!("Already capturing");
        }

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let config = self.config.clone();
        let frequency_hz = self.frequency_hz;
        let frame_len = samples_per_buffer(&config);

        info!(
            "Tone backend started ({:.1}Hz at {}Hz, {} channels)",
            frequency_hz, config.target_sample_rate, config.target_channels
        );

        self.task = Some(tokio::spawn(async move {
            let period = Duration::from_millis(config.buffer_duration_ms);
            let mut ticker = tokio::time::interval(period);
            let sample_rate = config.target_sample_rate as u64;
            let mut position: u64 = 0;
            let mut timestamp_ms = 0;

            loop {
                ticker.tick().await;

                let mut samples = Vec::with_capacity(frame_len * config.target_channels as usize);
                for i in 0..frame_len as u64 {
                    let t = ((position + i) % sample_rate) as f32 / sample_rate as f32;
                    let value = (TAU * frequency_hz * t).sin() * TONE_AMPLITUDE * i16::MAX as f32;
                    for _ in 0..config.target_channels {
                        samples.push(value as i16);
                    }
                }
                position += frame_len as u64;

                let frame = AudioFrame {
                    samples,
                    sample_rate: config.target_sample_rate,
                    channels: config.target_channels,
                    timestamp_ms,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
                timestamp_ms += config.buffer_duration_ms;
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Tone backend stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "tone generator"
    }
}

/// Replays a WAV file frame by frame, as if it were sung live
pub struct FileBackend {
    config: AudioBackendConfig,
    path: PathBuf,
    looped: bool,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(config: AudioBackendConfig, path: PathBuf, looped: bool) -> Result<Self> {
        validate(&config)?;
        Ok(Self {
            config,
            path,
            looped,
            task: None,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.task.is_some() {
            bail!("Already capturing");
        }

        let audio = AudioFile::open(&self.path)?;
        if audio.sample_rate != self.config.target_sample_rate
            || audio.channels != self.config.target_channels
        {
            bail!(
                "Input file is {}Hz/{}ch, capture expects {}Hz/{}ch",
                audio.sample_rate,
                audio.channels,
                self.config.target_sample_rate,
                self.config.target_channels
            );
        }
        if audio.samples.is_empty() {
            bail!("Input file has no samples: {}", audio.path);
        }

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let config = self.config.clone();
        let looped = self.looped;
        let chunk_len = samples_per_buffer(&config) * config.target_channels as usize;

        info!("File backend started: {} (looped={})", audio.path, looped);

        self.task = Some(tokio::spawn(async move {
            let period = Duration::from_millis(config.buffer_duration_ms);
            let mut ticker = tokio::time::interval(period);
            let mut timestamp_ms = 0;

            'replay: loop {
                for chunk in audio.samples.chunks(chunk_len) {
                    ticker.tick().await;
                    let frame = AudioFrame {
                        samples: chunk.to_vec(),
                        sample_rate: config.target_sample_rate,
                        channels: config.target_channels,
                        timestamp_ms,
                    };
                    if tx.send(frame).await.is_err() {
                        break 'replay;
                    }
                    timestamp_ms += config.buffer_duration_ms;
                }
                if !looped {
                    break;
                }
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("File backend stopped: {}", self.path.display());
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "file input"
    }
}
