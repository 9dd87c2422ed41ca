use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::take::TakeId;
use crate::error::{ErrorContext, ErrorKind};

/// Recording mode of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Idle,
    Capturing,
}

/// Transport state of the loaded take (`Stopped` when nothing is loaded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// State changes observed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    ModeChanged {
        mode: Mode,
    },
    TakeAdded {
        take_id: TakeId,
        display_name: String,
        file_path: PathBuf,
    },
    TakeRemoved {
        take_id: TakeId,
    },
    PlaybackStateChanged {
        take_id: TakeId,
        state: PlaybackState,
    },
    ErrorOccurred {
        kind: ErrorKind,
        context: ErrorContext,
    },
}
