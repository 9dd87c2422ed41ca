// Test doubles for the session collaborators
//
// Each double records every call so tests can assert on engine handle
// lifetimes, transport calls and live parameters.

#![allow(dead_code)]

use anyhow::{bail, Context, Result};
use karaoke_session::audio::{
    CaptureConfig, CaptureDevice, CaptureHandle, CompletionCallback, EngineHandle, Permission,
    PermissionProvider, PlaybackCompletion, PlaybackEngine,
};
use karaoke_session::{SessionConfig, SessionController, TakeId};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ============================================================================
// Playback engine
// ============================================================================

#[derive(Default)]
struct EngineLog {
    next_id: u64,
    live: HashMap<u64, PathBuf>,
    loads: Vec<(u64, PathBuf)>,
    released: Vec<u64>,
    plays: Vec<(u64, bool)>,
    pauses: Vec<u64>,
    stops: Vec<u64>,
    volume: HashMap<u64, f32>,
    pitch: HashMap<u64, f32>,
    callbacks: HashMap<u64, CompletionCallback>,
    peak_take_handles: usize,
    background: Option<PathBuf>,
    fail_load: HashSet<PathBuf>,
    fail_pitch: bool,
    fail_pause: bool,
    retain_callbacks: bool,
}

impl EngineLog {
    fn live_take_handles(&self) -> usize {
        self.live
            .values()
            .filter(|path| Some(*path) != self.background.as_ref())
            .count()
    }

    fn require_live(&self, handle: &EngineHandle) -> Result<()> {
        if !self.live.contains_key(&handle.id()) {
            bail!("handle {} is not live", handle.id());
        }
        Ok(())
    }

    fn drop_callback(&mut self, id: u64) {
        if !self.retain_callbacks {
            self.callbacks.remove(&id);
        }
    }
}

#[derive(Default)]
pub struct FakeEngine {
    log: Mutex<EngineLog>,
}

impl FakeEngine {
    /// Loads of this path count as the background track, not a take
    pub fn set_background(&self, path: &Path) {
        self.log.lock().unwrap().background = Some(path.to_path_buf());
    }

    pub fn fail_loads_of(&self, path: &Path) {
        self.log.lock().unwrap().fail_load.insert(path.to_path_buf());
    }

    pub fn set_fail_pitch(&self, fail: bool) {
        self.log.lock().unwrap().fail_pitch = fail;
    }

    pub fn set_fail_pause(&self, fail: bool) {
        self.log.lock().unwrap().fail_pause = fail;
    }

    /// Keep completion callbacks after pause/stop/release, like a sloppy engine
    pub fn retain_callbacks(&self) {
        self.log.lock().unwrap().retain_callbacks = true;
    }

    /// Fire the pending completion of a handle. Returns false if none is pending.
    pub fn complete(&self, handle_id: u64, completion: PlaybackCompletion) -> bool {
        let callback = self.log.lock().unwrap().callbacks.remove(&handle_id);
        match callback {
            Some(callback) => {
                callback(completion);
                true
            }
            None => false,
        }
    }

    pub fn finish(&self, handle_id: u64) -> bool {
        self.complete(handle_id, PlaybackCompletion::Finished)
    }

    pub fn load_count(&self) -> usize {
        self.log.lock().unwrap().loads.len()
    }

    pub fn last_loaded_id(&self) -> Option<u64> {
        self.log.lock().unwrap().loads.last().map(|(id, _)| *id)
    }

    pub fn live_handles(&self) -> usize {
        self.log.lock().unwrap().live.len()
    }

    pub fn live_take_handles(&self) -> usize {
        self.log.lock().unwrap().live_take_handles()
    }

    pub fn peak_take_handles(&self) -> usize {
        self.log.lock().unwrap().peak_take_handles
    }

    pub fn is_live(&self, handle_id: u64) -> bool {
        self.log.lock().unwrap().live.contains_key(&handle_id)
    }

    pub fn release_count(&self, handle_id: u64) -> usize {
        self.log
            .lock()
            .unwrap()
            .released
            .iter()
            .filter(|id| **id == handle_id)
            .count()
    }

    pub fn plays(&self) -> Vec<(u64, bool)> {
        self.log.lock().unwrap().plays.clone()
    }

    pub fn pause_count(&self) -> usize {
        self.log.lock().unwrap().pauses.len()
    }

    pub fn stop_count(&self, handle_id: u64) -> usize {
        self.log
            .lock()
            .unwrap()
            .stops
            .iter()
            .filter(|id| **id == handle_id)
            .count()
    }

    pub fn pitch(&self, handle_id: u64) -> Option<f32> {
        self.log.lock().unwrap().pitch.get(&handle_id).copied()
    }

    pub fn volume(&self, handle_id: u64) -> Option<f32> {
        self.log.lock().unwrap().volume.get(&handle_id).copied()
    }

    pub fn handle_for(&self, path: &Path) -> Option<u64> {
        self.log
            .lock()
            .unwrap()
            .live
            .iter()
            .find(|(_, live_path)| live_path.as_path() == path)
            .map(|(id, _)| *id)
    }
}

#[async_trait::async_trait]
impl PlaybackEngine for FakeEngine {
    async fn load_asset(&self, path: &Path) -> Result<EngineHandle> {
        let mut log = self.log.lock().unwrap();
        if log.fail_load.contains(path) {
            bail!("cannot decode {}", path.display());
        }

        log.next_id += 1;
        let id = log.next_id;
        log.live.insert(id, path.to_path_buf());
        log.loads.push((id, path.to_path_buf()));
        log.peak_take_handles = log.peak_take_handles.max(log.live_take_handles());

        Ok(EngineHandle::new(id))
    }

    async fn play(
        &self,
        handle: &EngineHandle,
        looping: bool,
        on_complete: CompletionCallback,
    ) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.require_live(handle)?;
        log.plays.push((handle.id(), looping));
        log.callbacks.insert(handle.id(), on_complete);
        Ok(())
    }

    async fn pause(&self, handle: &EngineHandle) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.require_live(handle)?;
        if log.fail_pause {
            bail!("transport jammed");
        }
        log.pauses.push(handle.id());
        log.drop_callback(handle.id());
        Ok(())
    }

    async fn stop(&self, handle: &EngineHandle) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.require_live(handle)?;
        log.stops.push(handle.id());
        log.drop_callback(handle.id());
        Ok(())
    }

    async fn release(&self, handle: EngineHandle) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.live
            .remove(&handle.id())
            .with_context(|| format!("double release of handle {}", handle.id()))?;
        log.released.push(handle.id());
        log.drop_callback(handle.id());
        Ok(())
    }

    async fn set_volume(&self, handle: &EngineHandle, volume: f32) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.require_live(handle)?;
        log.volume.insert(handle.id(), volume);
        Ok(())
    }

    async fn set_pitch_ratio(&self, handle: &EngineHandle, ratio: f32) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.require_live(handle)?;
        if log.fail_pitch {
            bail!("pitch shifter offline");
        }
        log.pitch.insert(handle.id(), ratio);
        Ok(())
    }

    fn name(&self) -> &str {
        "fake engine"
    }
}

// ============================================================================
// Capture device
// ============================================================================

#[derive(Default)]
struct CaptureLog {
    next_id: u64,
    open: HashMap<u64, PathBuf>,
    opened: usize,
    closed: usize,
    fail_open: bool,
    fail_close: bool,
}

#[derive(Default)]
pub struct FakeCapture {
    log: Mutex<CaptureLog>,
}

impl FakeCapture {
    pub fn set_fail_open(&self, fail: bool) {
        self.log.lock().unwrap().fail_open = fail;
    }

    pub fn set_fail_close(&self, fail: bool) {
        self.log.lock().unwrap().fail_close = fail;
    }

    pub fn opened(&self) -> usize {
        self.log.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.log.lock().unwrap().closed
    }

    pub fn open_streams(&self) -> usize {
        self.log.lock().unwrap().open.len()
    }
}

#[async_trait::async_trait]
impl CaptureDevice for FakeCapture {
    async fn open_capture(
        &self,
        _config: &CaptureConfig,
        destination: &Path,
    ) -> Result<CaptureHandle> {
        let mut log = self.log.lock().unwrap();
        if log.fail_open {
            bail!("device busy");
        }
        log.next_id += 1;
        let id = log.next_id;
        log.open.insert(id, destination.to_path_buf());
        log.opened += 1;
        Ok(CaptureHandle::new(id, destination.to_path_buf()))
    }

    async fn close_capture(&self, handle: CaptureHandle) -> Result<PathBuf> {
        let mut log = self.log.lock().unwrap();
        let path = log
            .open
            .remove(&handle.id())
            .with_context(|| format!("unknown capture {}", handle.id()))?;
        if log.fail_close {
            bail!("I/O error flushing {}", path.display());
        }
        log.closed += 1;
        Ok(path)
    }

    fn name(&self) -> &str {
        "fake capture"
    }
}

// ============================================================================
// Permissions
// ============================================================================

pub struct FakePermissions {
    check: Permission,
    request: Permission,
    requests: Mutex<usize>,
}

impl FakePermissions {
    pub fn new(check: Permission, request: Permission) -> Self {
        Self {
            check,
            request,
            requests: Mutex::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::new(Permission::Granted, Permission::Granted)
    }

    pub fn requests(&self) -> usize {
        *self.requests.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl PermissionProvider for FakePermissions {
    async fn check_microphone(&self) -> Result<Permission> {
        Ok(self.check)
    }

    async fn request_microphone(&self) -> Result<Permission> {
        *self.requests.lock().unwrap() += 1;
        Ok(self.request)
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub controller: SessionController,
    pub engine: Arc<FakeEngine>,
    pub capture: Arc<FakeCapture>,
    pub permissions: Arc<FakePermissions>,
    pub temp_dir: TempDir,
}

pub fn session_config(temp_dir: &TempDir) -> SessionConfig {
    SessionConfig {
        recordings_dir: temp_dir.path().join("takes"),
        ..SessionConfig::default()
    }
}

pub fn harness_with(
    configure: impl FnOnce(&mut SessionConfig, &FakeEngine),
    permissions: FakePermissions,
) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(FakeEngine::default());
    let capture = Arc::new(FakeCapture::default());
    let permissions = Arc::new(permissions);

    let mut config = session_config(&temp_dir);
    configure(&mut config, &engine);

    let controller = SessionController::new(
        config,
        capture.clone(),
        engine.clone(),
        permissions.clone(),
    );

    Harness {
        controller,
        engine,
        capture,
        permissions,
        temp_dir,
    }
}

pub fn harness() -> Harness {
    harness_with(|_, _| {}, FakePermissions::granted())
}

/// A harness whose session has already begun
pub async fn begun_harness() -> Harness {
    let mut h = harness();
    h.controller.begin_session().await.unwrap();
    h
}

/// Record one take and return its id
pub async fn record_take(controller: &mut SessionController) -> TakeId {
    controller.start_recording().await.unwrap();
    controller.stop_recording().await.unwrap().unwrap()
}

pub fn take_path(controller: &SessionController, take_id: TakeId) -> PathBuf {
    controller.take(take_id).unwrap().file_path().to_path_buf()
}

/// Engine handle currently holding a take
pub fn handle_of(h: &Harness, take_id: TakeId) -> u64 {
    h.engine.handle_for(&take_path(&h.controller, take_id)).unwrap()
}

// ============================================================================
// Fixtures
// ============================================================================

/// Write a 16-bit WAV of `duration_ms` with a ramp signal
pub fn write_wav(path: &Path, sample_rate: u32, channels: u16, duration_ms: u64) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;

    let frames = sample_rate as u64 * duration_ms / 1000;
    for frame in 0..frames {
        let sample = ((frame % 256) as i16 - 128) * 64;
        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;

    Ok(())
}
