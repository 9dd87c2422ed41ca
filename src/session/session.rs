use super::config::SessionConfig;
use super::events::{Mode, PlaybackState, SessionEvent};
use super::snapshot::{SessionSnapshot, TakeView};
use super::take::{clamp_semitones, clamp_volume, PlayButton, PlaybackOutcome, Take, TakeId};
use crate::audio::{
    pitch_ratio, CaptureDevice, CaptureHandle, CompletionCallback, EngineHandle, Permission,
    PermissionProvider, PlaybackCompletion, PlaybackEngine,
};
use crate::error::{ErrorKind, SessionError, SessionResult};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Playing,
    Paused,
}

/// The single take loaded into the playback engine
struct ActivePlayback {
    take_id: TakeId,
    handle: EngineHandle,
    transport: Transport,
    looping: bool,
    /// Completion notices carrying any other generation are stale
    generation: u64,
}

/// A playback engine's completion report, tagged for the controller
#[derive(Debug)]
pub struct CompletionNotice {
    generation: u64,
    take_id: TakeId,
    completion: PlaybackCompletion,
}

/// Coordinates recording, takes and playback for one karaoke session
///
/// All operations take `&mut self`: callers serialize access (see
/// `spawn_session` for the actor wrapper). Engine completion callbacks only
/// queue a `CompletionNotice`; the notice is applied by `handle_completion`
/// on the same serialized context.
pub struct SessionController {
    /// Session configuration
    config: SessionConfig,

    capture: Arc<dyn CaptureDevice>,
    engine: Arc<dyn PlaybackEngine>,
    permissions: Arc<dyn PermissionProvider>,

    /// When the controller was created
    started_at: DateTime<Utc>,

    /// Set by `begin_session`, cleared by `end_session`
    begun: bool,

    /// Open capture stream while in `Mode::Capturing`
    capturing: Option<CaptureHandle>,

    master_volume: f32,

    /// Takes in creation order
    takes: Vec<Take>,

    /// At most one take engine handle is alive, and it lives here
    active: Option<ActivePlayback>,

    /// Sing-along track, loaded once per session
    background: Option<EngineHandle>,

    /// Counters for display names and capture file names
    takes_created: usize,
    captures_opened: u64,

    generation: u64,
    completion_tx: mpsc::UnboundedSender<CompletionNotice>,
    completion_rx: mpsc::UnboundedReceiver<CompletionNotice>,

    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        capture: Arc<dyn CaptureDevice>,
        engine: Arc<dyn PlaybackEngine>,
        permissions: Arc<dyn PermissionProvider>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let master_volume = clamp_volume(config.initial_volume);

        info!(
            "Session controller created (capture: {}, engine: {})",
            capture.name(),
            engine.name()
        );

        Self {
            config,
            capture,
            engine,
            permissions,
            started_at: Utc::now(),
            begun: false,
            capturing: None,
            master_volume,
            takes: Vec::new(),
            active: None,
            background: None,
            takes_created: 0,
            captures_opened: 0,
            generation: 0,
            completion_tx,
            completion_rx,
            events,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Check microphone permission and load the background track
    ///
    /// A background track that fails to load is reported as
    /// `ResourceUnavailable`, but the session stays usable: recording
    /// proceeds without a sing-along reference.
    pub async fn begin_session(&mut self) -> SessionResult<()> {
        const OP: &str = "begin_session";

        if self.begun {
            return Err(self.fail(SessionError::invalid_state(OP, "session already begun")));
        }

        self.ensure_permission(OP).await?;
        self.begun = true;

        let Some(path) = self.config.background_track.clone() else {
            info!("Session begun without a background track");
            return Ok(());
        };

        match self.load_background(&path).await {
            Ok(handle) => {
                info!("Session begun with background track: {}", path.display());
                self.background = Some(handle);
                Ok(())
            }
            Err(e) => Err(self.fail(SessionError::from_collaborator(
                ErrorKind::ResourceUnavailable,
                OP,
                &e,
            ))),
        }
    }

    /// Release every engine handle and close any in-flight capture
    ///
    /// Best effort: failures are logged, and the session always ends up idle
    /// with nothing loaded. A capture closed here does not become a take.
    pub async fn end_session(&mut self) {
        if let Some(handle) = self.capturing.take() {
            match self.capture.close_capture(handle).await {
                Ok(path) => info!("Discarded in-flight capture: {}", path.display()),
                Err(e) => warn!("Failed to close capture at session end: {:#}", e),
            }
            self.emit(SessionEvent::ModeChanged { mode: Mode::Idle });
        }

        if let Some((take_id, Err(e))) = self.teardown_active().await {
            warn!("Failed to release take {} at session end: {:#}", take_id, e);
        }

        if let Some(background) = self.background.take() {
            if let Err(e) = self.engine.stop(&background).await {
                warn!("Failed to stop background track: {:#}", e);
            }
            if let Err(e) = self.engine.release(background).await {
                warn!("Failed to release background track: {:#}", e);
            }
        }

        self.begun = false;
        info!("Session ended ({} takes)", self.takes.len());
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    /// Start capturing a new take over the background track
    ///
    /// Interrupts any take playback instead of rejecting the request. The
    /// capture is opened before playback is stopped, so a device failure
    /// leaves the playing take untouched.
    pub async fn start_recording(&mut self) -> SessionResult<()> {
        const OP: &str = "start_recording";

        if !self.begun {
            return Err(self.fail(SessionError::invalid_state(OP, "session not begun")));
        }
        if self.capturing.is_some() {
            return Err(self.fail(SessionError::invalid_state(OP, "already recording")));
        }

        self.ensure_permission(OP).await?;

        self.captures_opened += 1;
        let destination = self.config.recordings_dir.join(format!(
            "recording-{}-{}.wav",
            Utc::now().timestamp_millis(),
            self.captures_opened
        ));

        let handle = match self.capture.open_capture(&self.config.capture, &destination).await {
            Ok(handle) => handle,
            Err(e) => {
                return Err(self.fail(SessionError::from_collaborator(
                    ErrorKind::DeviceUnavailable,
                    OP,
                    &e,
                )))
            }
        };

        if self.active.is_some() {
            info!("Interrupting playback to record");
            if let Err(e) = self.stop_playback().await {
                warn!("Playback did not stop cleanly: {}", e);
            }
        }

        if let Err(e) = self.start_background().await {
            warn!("Background track did not start: {:#}", e);
        }

        info!("Recording started: {}", destination.display());
        self.capturing = Some(handle);
        self.emit(SessionEvent::ModeChanged { mode: Mode::Capturing });

        Ok(())
    }

    /// Finish the capture and save it as a new take
    ///
    /// Returns `None` when nothing was being recorded. The session is idle
    /// afterwards even if closing the capture fails.
    pub async fn stop_recording(&mut self) -> SessionResult<Option<TakeId>> {
        const OP: &str = "stop_recording";

        let Some(handle) = self.capturing.take() else {
            debug!("stop_recording while idle, ignoring");
            return Ok(None);
        };

        if let Some(background) = &self.background {
            if let Err(e) = self.engine.stop(background).await {
                warn!("Failed to stop background track: {:#}", e);
            }
        }

        let closed = self.capture.close_capture(handle).await;
        self.emit(SessionEvent::ModeChanged { mode: Mode::Idle });

        let file_path = match closed {
            Ok(path) => path,
            Err(e) => {
                return Err(self.fail(SessionError::from_collaborator(
                    ErrorKind::CaptureFailed,
                    OP,
                    &e,
                )))
            }
        };

        self.takes_created += 1;
        let take = Take::new(file_path, format!("Recording {}", self.takes_created));
        let take_id = take.id();

        info!("Take saved: {} ({})", take.display_name(), take.file_path().display());
        self.emit(SessionEvent::TakeAdded {
            take_id,
            display_name: take.display_name().to_string(),
            file_path: take.file_path().to_path_buf(),
        });
        self.takes.push(take);

        Ok(Some(take_id))
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    /// Play a take from the beginning, using the configured loop policy
    pub async fn play_take(&mut self, take_id: TakeId) -> SessionResult<()> {
        let looping = self.config.loop_playback;
        self.play_take_with(take_id, looping).await
    }

    /// Play a take from the beginning on a fresh engine handle
    ///
    /// Whatever take was loaded before is released first.
    pub async fn play_take_with(&mut self, take_id: TakeId, looping: bool) -> SessionResult<()> {
        const OP: &str = "play_take";

        if self.capturing.is_some() {
            return Err(self.fail(
                SessionError::invalid_state(OP, "stop recording before playing a take")
                    .with_take(take_id),
            ));
        }

        let Some(take) = self.take(take_id) else {
            return Err(
                self.fail(SessionError::invalid_state(OP, "unknown take").with_take(take_id))
            );
        };
        let path = take.file_path().to_path_buf();
        let semitones = take.pitch_semitones();

        if let Some((previous, Err(e))) = self.teardown_active().await {
            warn!("Failed to release take {}: {:#}", previous, e);
        }

        let handle = match self.engine.load_asset(&path).await {
            Ok(handle) => handle,
            Err(e) => {
                return Err(self.fail(
                    SessionError::from_collaborator(ErrorKind::PlaybackFailed, OP, &e)
                        .with_take(take_id),
                ))
            }
        };

        let generation = self.next_generation();
        let on_complete = self.completion_callback(generation, take_id);

        if let Err(e) = self.start_voice(&handle, semitones, looping, on_complete).await {
            if let Err(release_err) = self.engine.release(handle).await {
                warn!("Failed to release take {} after failed start: {:#}", take_id, release_err);
            }
            return Err(self.fail(
                SessionError::from_collaborator(ErrorKind::PlaybackFailed, OP, &e)
                    .with_take(take_id),
            ));
        }

        info!(
            "Playing take {} (pitch {:+} semitones, volume {:.2}, looping={})",
            take_id, semitones, self.master_volume, looping
        );

        self.active = Some(ActivePlayback {
            take_id,
            handle,
            transport: Transport::Playing,
            looping,
            generation,
        });
        self.emit(SessionEvent::PlaybackStateChanged {
            take_id,
            state: PlaybackState::Playing,
        });

        Ok(())
    }

    /// Pause the loaded take, keeping its engine handle for an exact resume
    pub async fn pause_playback(&mut self) -> SessionResult<()> {
        const OP: &str = "pause_playback";

        // Retire the running transport's generation before it can complete
        let generation = self.next_generation();

        let (take_id, paused) = match &self.active {
            Some(active) if active.transport == Transport::Playing => {
                (active.take_id, self.engine.pause(&active.handle).await)
            }
            _ => return Err(self.fail(SessionError::invalid_state(OP, "nothing is playing"))),
        };

        if let Err(e) = paused {
            return Err(self.abandon_active(OP, take_id, e).await);
        }

        if let Some(active) = self.active.as_mut() {
            active.transport = Transport::Paused;
            active.generation = generation;
        }

        info!("Paused take {}", take_id);
        self.emit(SessionEvent::PlaybackStateChanged {
            take_id,
            state: PlaybackState::Paused,
        });

        Ok(())
    }

    /// Resume the paused take on the same engine handle
    pub async fn resume_playback(&mut self) -> SessionResult<()> {
        const OP: &str = "resume_playback";

        let generation = self.next_generation();

        let (take_id, resumed) = match &self.active {
            Some(active) if active.transport == Transport::Paused => {
                let on_complete = self.completion_callback(generation, active.take_id);
                let resumed = self
                    .engine
                    .play(&active.handle, active.looping, on_complete)
                    .await;
                (active.take_id, resumed)
            }
            _ => return Err(self.fail(SessionError::invalid_state(OP, "nothing is paused"))),
        };

        if let Err(e) = resumed {
            return Err(self.abandon_active(OP, take_id, e).await);
        }

        if let Some(active) = self.active.as_mut() {
            active.transport = Transport::Playing;
            active.generation = generation;
        }

        info!("Resumed take {}", take_id);
        self.emit(SessionEvent::PlaybackStateChanged {
            take_id,
            state: PlaybackState::Playing,
        });

        Ok(())
    }

    /// Stop and unload the loaded take
    pub async fn stop_playback(&mut self) -> SessionResult<()> {
        const OP: &str = "stop_playback";

        let Some((take_id, released)) = self.teardown_active().await else {
            return Err(self.fail(SessionError::invalid_state(OP, "no take is loaded")));
        };

        if let Some(take) = self.take_mut(take_id) {
            take.last_outcome = PlaybackOutcome::StoppedByUser;
        }
        info!("Stopped take {}", take_id);

        released.map_err(|e| {
            self.fail(
                SessionError::from_collaborator(ErrorKind::PlaybackFailed, OP, &e)
                    .with_take(take_id),
            )
        })
    }

    /// Pause, resume or (re)start a take, as its play control would
    pub async fn toggle_playback(&mut self, take_id: TakeId) -> SessionResult<()> {
        let transport = self
            .active
            .as_ref()
            .filter(|active| active.take_id == take_id)
            .map(|active| active.transport);

        match transport {
            Some(Transport::Playing) => self.pause_playback().await,
            Some(Transport::Paused) => self.resume_playback().await,
            None => self.play_take(take_id).await,
        }
    }

    // ------------------------------------------------------------------
    // Parameters and catalog
    // ------------------------------------------------------------------

    /// Store a take's pitch shift and apply it live if the take is loaded
    ///
    /// Returns the clamped value. Unknown takes are ignored. If the engine
    /// rejects the live change, the take is unloaded so the stored and live
    /// pitch cannot disagree.
    pub async fn adjust_pitch(&mut self, take_id: TakeId, semitones: f32) -> SessionResult<f32> {
        const OP: &str = "adjust_pitch";

        let semitones = clamp_semitones(semitones);
        let Some(take) = self.take_mut(take_id) else {
            debug!("Pitch change for unknown take {}, ignoring", take_id);
            return Ok(semitones);
        };
        take.pitch_semitones = semitones;

        let applied = match &self.active {
            Some(active) if active.take_id == take_id => {
                self.engine
                    .set_pitch_ratio(&active.handle, pitch_ratio(semitones))
                    .await
            }
            _ => return Ok(semitones),
        };

        if let Err(e) = applied {
            return Err(self.abandon_active(OP, take_id, e).await);
        }

        debug!("Take {} pitch now {:+} semitones", take_id, semitones);
        Ok(semitones)
    }

    /// Set the shared output volume
    ///
    /// Applied to the background track while recording and to the loaded
    /// take; otherwise only stored for the next load. Returns the clamped value.
    pub async fn set_master_volume(&mut self, volume: f32) -> SessionResult<f32> {
        const OP: &str = "set_master_volume";

        let volume = clamp_volume(volume);
        self.master_volume = volume;

        if self.capturing.is_some() {
            if let Some(background) = &self.background {
                if let Err(e) = self.engine.set_volume(background, volume).await {
                    warn!("Failed to set background volume: {:#}", e);
                }
            }
        }

        let (take_id, applied) = match &self.active {
            Some(active) => (
                active.take_id,
                self.engine.set_volume(&active.handle, volume).await,
            ),
            None => return Ok(volume),
        };

        if let Err(e) = applied {
            return Err(self.abandon_active(OP, take_id, e).await);
        }

        Ok(volume)
    }

    /// Remove a take, unloading it first if it is loaded
    ///
    /// Deleting an unknown take is a no-op. The recorded file stays on disk.
    pub async fn delete_take(&mut self, take_id: TakeId) -> SessionResult<()> {
        const OP: &str = "delete_take";

        let Some(index) = self.takes.iter().position(|take| take.id() == take_id) else {
            debug!("Delete of unknown take {}, ignoring", take_id);
            return Ok(());
        };

        let teardown = if self.active_take_id() == Some(take_id) {
            self.teardown_active().await
        } else {
            None
        };

        let take = self.takes.remove(index);
        info!("Take deleted: {}", take.display_name());
        self.emit(SessionEvent::TakeRemoved { take_id });

        if let Some((_, Err(e))) = teardown {
            return Err(self.fail(
                SessionError::from_collaborator(ErrorKind::PlaybackFailed, OP, &e)
                    .with_take(take_id),
            ));
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Completion handling
    // ------------------------------------------------------------------

    /// Wait for the next engine completion notice
    pub async fn next_completion(&mut self) -> Option<CompletionNotice> {
        self.completion_rx.recv().await
    }

    /// Apply every completion notice queued so far. Returns how many were seen.
    pub async fn pump_completions(&mut self) -> usize {
        let mut seen = 0;
        while let Ok(notice) = self.completion_rx.try_recv() {
            self.handle_completion(notice).await;
            seen += 1;
        }
        seen
    }

    /// Finalize a transport that ended on its own
    ///
    /// Notices for a superseded play, paused transport or released handle
    /// are dropped.
    pub async fn handle_completion(&mut self, notice: CompletionNotice) {
        let current = matches!(
            &self.active,
            Some(active)
                if active.generation == notice.generation && active.take_id == notice.take_id
        );
        if !current {
            debug!(
                "Ignoring stale completion for take {} (generation {})",
                notice.take_id, notice.generation
            );
            return;
        }

        let Some(active) = self.active.take() else {
            return;
        };
        let take_id = active.take_id;

        if let Err(e) = self.engine.release(active.handle).await {
            warn!("Failed to release finished take {}: {:#}", take_id, e);
        }
        self.emit(SessionEvent::PlaybackStateChanged {
            take_id,
            state: PlaybackState::Stopped,
        });

        match notice.completion {
            PlaybackCompletion::Finished => {
                if let Some(take) = self.take_mut(take_id) {
                    take.last_outcome = PlaybackOutcome::FinishedNaturally;
                }
                info!("Take {} finished playing", take_id);
            }
            PlaybackCompletion::Failed(reason) => {
                self.fail(
                    SessionError::new(ErrorKind::PlaybackFailed, "playback", reason)
                        .with_take(take_id),
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_begun(&self) -> bool {
        self.begun
    }

    pub fn mode(&self) -> Mode {
        if self.capturing.is_some() {
            Mode::Capturing
        } else {
            Mode::Idle
        }
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn takes(&self) -> &[Take] {
        &self.takes
    }

    pub fn take(&self, take_id: TakeId) -> Option<&Take> {
        self.takes.iter().find(|take| take.id() == take_id)
    }

    pub fn active_take_id(&self) -> Option<TakeId> {
        self.active.as_ref().map(|active| active.take_id)
    }

    pub fn playback_state(&self) -> PlaybackState {
        match self.active.as_ref().map(|active| active.transport) {
            Some(Transport::Playing) => PlaybackState::Playing,
            Some(Transport::Paused) => PlaybackState::Paused,
            None => PlaybackState::Stopped,
        }
    }

    pub fn has_background_track(&self) -> bool {
        self.background.is_some()
    }

    /// What the play control of a take should offer
    pub fn play_button(&self, take_id: TakeId) -> Option<PlayButton> {
        let take = self.take(take_id)?;
        let transport = self
            .active
            .as_ref()
            .filter(|active| active.take_id == take_id)
            .map(|active| active.transport);

        Some(match transport {
            Some(Transport::Playing) => PlayButton::Pause,
            Some(Transport::Paused) => PlayButton::Resume,
            None if take.last_outcome() == PlaybackOutcome::FinishedNaturally => {
                PlayButton::PlayAgain
            }
            None => PlayButton::Play,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let takes = self
            .takes
            .iter()
            .map(|take| TakeView {
                id: take.id(),
                display_name: take.display_name().to_string(),
                file_path: take.file_path().to_path_buf(),
                pitch_semitones: take.pitch_semitones(),
                last_outcome: take.last_outcome(),
                created_at: take.created_at(),
                play_button: self.play_button(take.id()).unwrap_or(PlayButton::Play),
            })
            .collect();

        SessionSnapshot {
            mode: self.mode(),
            master_volume: self.master_volume,
            active_take_id: self.active_take_id(),
            playback_state: self.playback_state(),
            background_loaded: self.background.is_some(),
            started_at: self.started_at,
            takes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<SessionEvent> {
        self.events.clone()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn take_mut(&mut self, take_id: TakeId) -> Option<&mut Take> {
        self.takes.iter_mut().find(|take| take.id() == take_id)
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn completion_callback(&self, generation: u64, take_id: TakeId) -> CompletionCallback {
        let tx = self.completion_tx.clone();
        Box::new(move |completion| {
            // Receiver lives as long as the controller
            tx.send(CompletionNotice {
                generation,
                take_id,
                completion,
            })
            .ok();
        })
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        self.events.send(event).ok();
    }

    /// Log a failure, publish it to observers and hand it back
    fn fail(&self, error: SessionError) -> SessionError {
        error!("{}", error);
        self.emit(SessionEvent::ErrorOccurred {
            kind: error.kind(),
            context: error.context(),
        });
        error
    }

    async fn ensure_permission(&self, operation: &'static str) -> SessionResult<()> {
        let checked = match self.permissions.check_microphone().await {
            Ok(Permission::Denied) => self.permissions.request_microphone().await,
            other => other,
        };

        match checked {
            Ok(Permission::Granted) => Ok(()),
            Ok(Permission::Denied) => Err(self.fail(SessionError::new(
                ErrorKind::PermissionDenied,
                operation,
                "microphone permission denied",
            ))),
            Err(e) => Err(self.fail(SessionError::from_collaborator(
                ErrorKind::PermissionDenied,
                operation,
                &e,
            ))),
        }
    }

    async fn load_background(&self, path: &Path) -> anyhow::Result<EngineHandle> {
        let handle = self.engine.load_asset(path).await?;
        if let Err(e) = self.engine.set_volume(&handle, self.master_volume).await {
            if let Err(release_err) = self.engine.release(handle).await {
                warn!("Failed to release background track: {:#}", release_err);
            }
            return Err(e);
        }
        Ok(handle)
    }

    async fn start_background(&self) -> anyhow::Result<()> {
        let Some(background) = &self.background else {
            return Ok(());
        };
        self.engine.set_volume(background, self.master_volume).await?;
        self.engine
            .play(
                background,
                false,
                Box::new(|completion| debug!("Background track ended: {:?}", completion)),
            )
            .await
    }

    async fn start_voice(
        &self,
        handle: &EngineHandle,
        semitones: f32,
        looping: bool,
        on_complete: CompletionCallback,
    ) -> anyhow::Result<()> {
        self.engine.set_pitch_ratio(handle, pitch_ratio(semitones)).await?;
        self.engine.set_volume(handle, self.master_volume).await?;
        self.engine.play(handle, looping, on_complete).await
    }

    /// Stop and release the loaded take. The slot is empty afterwards even
    /// when the engine reports an error.
    async fn teardown_active(&mut self) -> Option<(TakeId, anyhow::Result<()>)> {
        let active = self.active.take()?;
        let take_id = active.take_id;

        let stopped = self.engine.stop(&active.handle).await;
        let released = self.engine.release(active.handle).await;

        self.emit(SessionEvent::PlaybackStateChanged {
            take_id,
            state: PlaybackState::Stopped,
        });

        Some((take_id, stopped.and(released)))
    }

    /// Unload the take after the engine rejected a call on it
    async fn abandon_active(
        &mut self,
        operation: &'static str,
        take_id: TakeId,
        cause: anyhow::Error,
    ) -> SessionError {
        if let Some((_, Err(e))) = self.teardown_active().await {
            warn!("Failed to release take {} after engine error: {:#}", take_id, e);
        }
        self.fail(
            SessionError::from_collaborator(ErrorKind::PlaybackFailed, operation, &cause)
                .with_take(take_id),
        )
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let mut handles = Vec::new();
        if let Some(active) = self.active.take() {
            handles.push(active.handle);
        }
        if let Some(background) = self.background.take() {
            handles.push(background);
        }
        let capture = self.capturing.take();

        if handles.is_empty() && capture.is_none() {
            return;
        }

        warn!(
            "Session dropped without end_session ({} engine handles, capture open: {})",
            handles.len(),
            capture.is_some()
        );

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("No tokio runtime to release session resources on");
            return;
        };

        let engine = Arc::clone(&self.engine);
        let device = Arc::clone(&self.capture);
        runtime.spawn(async move {
            if let Some(capture) = capture {
                if let Err(e) = device.close_capture(capture).await {
                    warn!("Failed to close orphaned capture: {:#}", e);
                }
            }
            for handle in handles {
                if let Err(e) = engine.stop(&handle).await {
                    debug!("Failed to stop orphaned handle: {:#}", e);
                }
                if let Err(e) = engine.release(handle).await {
                    warn!("Failed to release orphaned handle: {:#}", e);
                }
            }
        });
    }
}
