use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a started transport ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum PlaybackCompletion {
    /// Reached the end of the asset
    Finished,
    /// Engine gave up mid-playback
    Failed(String),
}

/// Invoked at most once when a transport started by `play` ends on its own
pub type CompletionCallback = Box<dyn FnOnce(PlaybackCompletion) + Send + 'static>;

/// One loaded, playable asset inside a playback engine.
///
/// Handles are move-only: `release` consumes them, so a released handle can
/// never be played again.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct EngineHandle(u64);

impl EngineHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Frequency multiplier for a pitch shift in semitones
pub fn pitch_ratio(semitones: f32) -> f32 {
    2f32.powf(semitones / 12.0)
}

/// Audio playback and mixing engine
///
/// Pause keeps the playhead; stop rewinds it. A callback handed to `play` is
/// dropped without being called when the transport is paused, stopped or
/// released before reaching the end.
#[async_trait::async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Load (and validate) an asset
    async fn load_asset(&self, path: &Path) -> Result<EngineHandle>;

    /// Start or resume the transport
    async fn play(
        &self,
        handle: &EngineHandle,
        looping: bool,
        on_complete: CompletionCallback,
    ) -> Result<()>;

    async fn pause(&self, handle: &EngineHandle) -> Result<()>;

    async fn stop(&self, handle: &EngineHandle) -> Result<()>;

    /// Unload the asset
    async fn release(&self, handle: EngineHandle) -> Result<()>;

    /// Gain in [0, 1]
    async fn set_volume(&self, handle: &EngineHandle, volume: f32) -> Result<()>;

    /// Pitch multiplier, > 0. Duration is unaffected.
    async fn set_pitch_ratio(&self, handle: &EngineHandle, ratio: f32) -> Result<()>;

    /// Engine name for logging
    fn name(&self) -> &str;
}
