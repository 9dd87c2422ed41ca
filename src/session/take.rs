use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

pub const MIN_SEMITONES: f32 = -12.0;
pub const MAX_SEMITONES: f32 = 12.0;

/// Unique identifier of a take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TakeId(Uuid);

impl TakeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TakeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TakeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// How the last playback of a take ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackOutcome {
    #[default]
    NeverPlayed,
    FinishedNaturally,
    StoppedByUser,
}

/// What the play control of a take should offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayButton {
    Play,
    PlayAgain,
    Pause,
    Resume,
}

impl PlayButton {
    pub fn label(self) -> &'static str {
        match self {
            PlayButton::Play => "Play",
            PlayButton::PlayAgain => "Play Again",
            PlayButton::Pause => "Pause",
            PlayButton::Resume => "Resume",
        }
    }
}

/// A saved vocal recording
#[derive(Debug, Clone)]
pub struct Take {
    pub(super) id: TakeId,
    pub(super) file_path: PathBuf,
    pub(super) display_name: String,
    pub(super) pitch_semitones: f32,
    pub(super) last_outcome: PlaybackOutcome,
    pub(super) created_at: DateTime<Utc>,
}

impl Take {
    pub(super) fn new(file_path: PathBuf, display_name: String) -> Self {
        Self {
            id: TakeId::new(),
            file_path,
            display_name,
            pitch_semitones: 0.0,
            last_outcome: PlaybackOutcome::NeverPlayed,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> TakeId {
        self.id
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Always within [-12, 12]
    pub fn pitch_semitones(&self) -> f32 {
        self.pitch_semitones
    }

    pub fn last_outcome(&self) -> PlaybackOutcome {
        self.last_outcome
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Clamp a pitch shift to [-12, 12]. Non-finite input resets to 0.
pub fn clamp_semitones(semitones: f32) -> f32 {
    if semitones.is_finite() {
        semitones.clamp(MIN_SEMITONES, MAX_SEMITONES)
    } else {
        0.0
    }
}

/// Clamp a gain to [0, 1]. NaN is treated as silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
