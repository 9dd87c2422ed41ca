use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::audio::CaptureConfig;

/// Configuration for a karaoke session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory new takes are captured into
    pub recordings_dir: PathBuf,

    /// Sing-along reference played while recording
    pub background_track: Option<PathBuf>,

    /// Capture stream format
    pub capture: CaptureConfig,

    /// Master volume at session start, in [0, 1]
    pub initial_volume: f32,

    /// Whether `play_take` loops takes by default
    pub loop_playback: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recordings_dir: std::env::temp_dir().join("karaoke-session"),
            background_track: None,
            capture: CaptureConfig::default(), // 44.1kHz stereo, 16-bit
            initial_volume: 0.8,
            loop_playback: false,
        }
    }
}
