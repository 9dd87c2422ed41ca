pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod session;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioSource,
    CaptureConfig, CaptureDevice, EngineHandle, HeadlessEngine, Permission, PermissionProvider,
    PlaybackCompletion, PlaybackEngine, StaticPermissions, WavCaptureDevice,
};
pub use config::Config;
pub use error::{ErrorKind, SessionError, SessionResult};
pub use http::{create_router, AppState};
pub use session::{
    spawn_session, Mode, PlayButton, PlaybackOutcome, PlaybackState, SessionConfig,
    SessionController, SessionEvent, SessionHandle, SessionSnapshot, Take, TakeId,
};
