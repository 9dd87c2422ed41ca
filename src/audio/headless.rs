// Transport-only playback engine: keeps time, volume and pitch per voice
// without driving an output device.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use super::engine::{CompletionCallback, EngineHandle, PlaybackCompletion, PlaybackEngine};
use super::file::AssetInfo;

struct Voice {
    info: AssetInfo,
    /// Playhead at the last pause/stop
    position: Duration,
    /// Set while the transport runs
    started_at: Option<Instant>,
    looping: bool,
    volume: f32,
    pitch_ratio: f32,
    timer: Option<JoinHandle<()>>,
}

impl Voice {
    fn playhead(&self) -> Duration {
        let Some(started_at) = self.started_at else {
            return self.position;
        };
        let elapsed = self.position + started_at.elapsed();
        if self.looping && !self.info.duration.is_zero() {
            Duration::from_nanos((elapsed.as_nanos() % self.info.duration.as_nanos()) as u64)
        } else {
            elapsed.min(self.info.duration)
        }
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Point-in-time view of one loaded voice
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceState {
    pub playing: bool,
    pub looping: bool,
    pub position: Duration,
    pub duration: Duration,
    pub volume: f32,
    pub pitch_ratio: f32,
}

/// Playback engine that tracks transport state against the wall clock
///
/// Assets are probed with symphonia on load, so undecodable files fail at
/// `load_asset`. A non-looping voice reports `Finished` once its remaining
/// duration has elapsed.
#[derive(Default)]
pub struct HeadlessEngine {
    next_id: AtomicU64,
    voices: Arc<Mutex<HashMap<u64, Voice>>>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn voice_state(&self, handle: &EngineHandle) -> Option<VoiceState> {
        let voices = self.voices.lock().await;
        voices.get(&handle.id()).map(|voice| VoiceState {
            playing: voice.started_at.is_some(),
            looping: voice.looping,
            position: voice.playhead(),
            duration: voice.info.duration,
            volume: voice.volume,
            pitch_ratio: voice.pitch_ratio,
        })
    }

    /// Number of loaded voices
    pub async fn live_voices(&self) -> usize {
        self.voices.lock().await.len()
    }
}

#[async_trait::async_trait]
impl PlaybackEngine for HeadlessEngine {
    async fn load_asset(&self, path: &Path) -> Result<EngineHandle> {
        let probe_path = path.to_path_buf();
        let info = tokio::task::spawn_blocking(move || AssetInfo::probe(probe_path))
            .await
            .context("Asset probe task panicked")??;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        info!(
            "Voice {} loaded: {} ({:.2}s, {}Hz, {} channels)",
            id,
            path.display(),
            info.duration.as_secs_f64(),
            info.sample_rate,
            info.channels
        );

        self.voices.lock().await.insert(
            id,
            Voice {
                info,
                position: Duration::ZERO,
                started_at: None,
                looping: false,
                volume: 1.0,
                pitch_ratio: 1.0,
                timer: None,
            },
        );

        Ok(EngineHandle::new(id))
    }

    async fn play(
        &self,
        handle: &EngineHandle,
        looping: bool,
        on_complete: CompletionCallback,
    ) -> Result<()> {
        let id = handle.id();
        let mut voices = self.voices.lock().await;
        let voice = voices
            .get_mut(&id)
            .with_context(|| format!("Unknown voice {}", id))?;

        if voice.started_at.is_some() {
            bail!("Voice {} is already playing", id);
        }

        voice.looping = looping;
        voice.started_at = Some(Instant::now());

        if looping {
            debug!("Voice {} looping from {:?}", id, voice.position);
            return Ok(());
        }

        let remaining = voice.info.duration.saturating_sub(voice.position);
        let shared = Arc::clone(&self.voices);
        voice.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            {
                let mut voices = shared.lock().await;
                if let Some(voice) = voices.get_mut(&id) {
                    voice.position = Duration::ZERO;
                    voice.started_at = None;
                    voice.timer = None;
                }
            }
            debug!("Voice {} reached the end", id);
            on_complete(PlaybackCompletion::Finished);
        }));

        Ok(())
    }

    async fn pause(&self, handle: &EngineHandle) -> Result<()> {
        let mut voices = self.voices.lock().await;
        let voice = voices
            .get_mut(&handle.id())
            .with_context(|| format!("Unknown voice {}", handle.id()))?;

        voice.disarm();
        voice.position = voice.playhead();
        voice.started_at = None;

        Ok(())
    }

    async fn stop(&self, handle: &EngineHandle) -> Result<()> {
        let mut voices = self.voices.lock().await;
        let voice = voices
            .get_mut(&handle.id())
            .with_context(|| format!("Unknown voice {}", handle.id()))?;

        voice.disarm();
        voice.position = Duration::ZERO;
        voice.started_at = None;

        Ok(())
    }

    async fn release(&self, handle: EngineHandle) -> Result<()> {
        let mut voice = self
            .voices
            .lock()
            .await
            .remove(&handle.id())
            .with_context(|| format!("Unknown voice {}", handle.id()))?;

        voice.disarm();
        info!("Voice {} released: {}", handle.id(), voice.info.path.display());

        Ok(())
    }

    async fn set_volume(&self, handle: &EngineHandle, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            bail!("Volume out of range: {}", volume);
        }

        let mut voices = self.voices.lock().await;
        let voice = voices
            .get_mut(&handle.id())
            .with_context(|| format!("Unknown voice {}", handle.id()))?;
        voice.volume = volume;

        Ok(())
    }

    async fn set_pitch_ratio(&self, handle: &EngineHandle, ratio: f32) -> Result<()> {
        if !ratio.is_finite() || ratio <= 0.0 {
            bail!("Pitch ratio must be positive, got {}", ratio);
        }

        let mut voices = self.voices.lock().await;
        let voice = voices
            .get_mut(&handle.id())
            .with_context(|| format!("Unknown voice {}", handle.id()))?;
        voice.pitch_ratio = ratio;

        Ok(())
    }

    fn name(&self) -> &str {
        "headless transport"
    }
}
