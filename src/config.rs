use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::audio::{AudioSource, CaptureConfig, Permission};
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub session: SessionSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Where takes are written; `~` and `$VARS` are expanded
    pub recordings_path: String,
    pub sample_rate: u32,
    pub channels: u16,
    #[serde(default = "default_bits_per_sample")]
    pub bits_per_sample: u16,
    #[serde(default)]
    pub input: InputConfig,
}

/// Frame source behind the capture device
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputConfig {
    Tone { frequency_hz: f32 },
    File {
        path: String,
        #[serde(default)]
        looped: bool,
    },
}

impl Default for InputConfig {
    fn default() -> Self {
        Self::Tone { frequency_hz: 440.0 }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    pub background_track: Option<String>,
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,
    #[serde(default)]
    pub loop_playback: bool,
    #[serde(default = "default_permission")]
    pub microphone_permission: Permission,
}

fn default_bits_per_sample() -> u16 {
    16
}

fn default_initial_volume() -> f32 {
    0.8
}

fn default_permission() -> Permission {
    Permission::Granted
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Controller settings derived from the file
    pub fn session_config(&self) -> Result<SessionConfig> {
        let recordings_dir = shellexpand::full(&self.audio.recordings_path)
            .with_context(|| {
                format!("Failed to expand recordings path: {}", self.audio.recordings_path)
            })?;

        Ok(SessionConfig {
            recordings_dir: PathBuf::from(recordings_dir.as_ref()),
            background_track: self.session.background_track.as_ref().map(PathBuf::from),
            capture: CaptureConfig {
                sample_rate: self.audio.sample_rate,
                channels: self.audio.channels,
                bits_per_sample: self.audio.bits_per_sample,
            },
            initial_volume: self.session.initial_volume,
            loop_playback: self.session.loop_playback,
        })
    }

    pub fn audio_source(&self) -> AudioSource {
        match &self.audio.input {
            InputConfig::Tone { frequency_hz } => AudioSource::Tone {
                frequency_hz: *frequency_hz,
            },
            InputConfig::File { path, looped } => AudioSource::File {
                path: PathBuf::from(path),
                looped: *looped,
            },
        }
    }
}
