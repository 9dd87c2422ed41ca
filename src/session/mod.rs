//! Karaoke session management
//!
//! This module provides the `SessionController` that manages:
//! - Recording takes over a background track (mutually exclusive with playback)
//! - The catalog of takes and their per-take pitch shift
//! - The single active playback slot (play, pause, resume, stop)
//! - The shared master volume
//! - State-change events for the presentation layer

mod config;
mod events;
mod handle;
mod session;
mod snapshot;
mod take;

pub use config::SessionConfig;
pub use events::{Mode, PlaybackState, SessionEvent};
pub use handle::{spawn_session, SessionHandle};
pub use session::{CompletionNotice, SessionController};
pub use snapshot::{SessionSnapshot, TakeView};
pub use take::{
    clamp_semitones, clamp_volume, PlayButton, PlaybackOutcome, Take, TakeId, MAX_SEMITONES,
    MIN_SEMITONES,
};
