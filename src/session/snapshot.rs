use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::events::{Mode, PlaybackState};
use super::take::{PlayButton, PlaybackOutcome, TakeId};

/// Serializable view of the whole session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Recording mode
    pub mode: Mode,

    /// Shared output volume (0.0 to 1.0)
    pub master_volume: f32,

    /// Take loaded into the playback engine, if any
    pub active_take_id: Option<TakeId>,

    /// Transport state of the loaded take
    pub playback_state: PlaybackState,

    /// Whether a background track is loaded
    pub background_loaded: bool,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Takes in creation order
    pub takes: Vec<TakeView>,
}

/// Serializable view of one take
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeView {
    pub id: TakeId,
    pub display_name: String,
    pub file_path: PathBuf,
    pub pitch_semitones: f32,
    pub last_outcome: PlaybackOutcome,
    pub created_at: DateTime<Utc>,
    pub play_button: PlayButton,
}
