pub mod backend;
pub mod capture;
pub mod engine;
pub mod file;
pub mod headless;
pub mod permission;
pub mod signal;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use capture::{CaptureConfig, CaptureDevice, CaptureHandle, WavCaptureDevice};
pub use engine::{pitch_ratio, CompletionCallback, EngineHandle, PlaybackCompletion, PlaybackEngine};
pub use file::{AssetInfo, AudioFile};
pub use headless::{HeadlessEngine, VoiceState};
pub use permission::{Permission, PermissionProvider, StaticPermissions};
pub use signal::{FileBackend, ToneBackend};
