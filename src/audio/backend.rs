use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;

use super::signal::{FileBackend, ToneBackend};

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Sample rate of emitted frames
    pub target_sample_rate: u32,
    /// Channel count of emitted frames (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 44100, // CD rate, what takes are recorded at
            target_channels: 2,        // Stereo
            buffer_duration_ms: 100,   // 100ms buffers
        }
    }
}

/// Audio frame source feeding a capture device
///
/// Implementations:
/// - Tone: synthetic sine voice (demo runs, tests)
/// - File: replays a WAV file as if it were sung live
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start producing audio
    ///
    /// Returns a channel receiver that will receive audio frames. The channel
    /// closes once the backend is stopped.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop producing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create audio backend for the given source
    pub fn create(
        source: AudioSource,
        config: AudioBackendConfig,
    ) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Tone { frequency_hz } => {
                Ok(Box::new(ToneBackend::new(config, frequency_hz)?))
            }
            AudioSource::File { path, looped } => {
                Ok(Box::new(FileBackend::new(config, path, looped)?))
            }
        }
    }
}

/// Audio source type
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// Sine tone at a fixed frequency
    Tone { frequency_hz: f32 },
    /// WAV file input (for rehearsals and tests)
    File { path: PathBuf, looped: bool },
}

impl Default for AudioSource {
    fn default() -> Self {
        Self::Tone { frequency_hz: 440.0 }
    }
}
