use serde::{Deserialize, Serialize};
use std::fmt;

use crate::session::TakeId;

/// Failure taxonomy surfaced by the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Microphone permission refused
    PermissionDenied,
    /// Capture device busy or inaccessible
    DeviceUnavailable,
    /// Background asset missing or corrupt
    ResourceUnavailable,
    /// I/O error while closing a capture stream
    CaptureFailed,
    /// Decode or playback engine error
    PlaybackFailed,
    /// Operation illegal in the current mode
    InvalidState,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::DeviceUnavailable => "device unavailable",
            ErrorKind::ResourceUnavailable => "resource unavailable",
            ErrorKind::CaptureFailed => "capture failed",
            ErrorKind::PlaybackFailed => "playback failed",
            ErrorKind::InvalidState => "invalid state",
        };
        f.write_str(name)
    }
}

/// Where a failure happened, for the user-facing report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_id: Option<TakeId>,
    pub message: String,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} in {operation}: {message}")]
pub struct SessionError {
    kind: ErrorKind,
    operation: &'static str,
    take_id: Option<TakeId>,
    message: String,
}

impl SessionError {
    pub fn new(kind: ErrorKind, operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            operation,
            take_id: None,
            message: message.into(),
        }
    }

    /// Translate a collaborator error, keeping its full context chain
    pub fn from_collaborator(
        kind: ErrorKind,
        operation: &'static str,
        error: &anyhow::Error,
    ) -> Self {
        Self::new(kind, operation, format!("{:#}", error))
    }

    pub fn invalid_state(operation: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, operation, message)
    }

    pub fn with_take(mut self, take_id: TakeId) -> Self {
        self.take_id = Some(take_id);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn take_id(&self) -> Option<TakeId> {
        self.take_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> ErrorContext {
        ErrorContext {
            operation: self.operation.to_string(),
            take_id: self.take_id,
            message: self.message.clone(),
        }
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_error_keeps_context_chain() {
        let err = anyhow::anyhow!("disk full").context("Failed to finalize WAV file");
        let session_err =
            SessionError::from_collaborator(ErrorKind::CaptureFailed, "stop_recording", &err);

        assert_eq!(session_err.kind(), ErrorKind::CaptureFailed);
        assert_eq!(session_err.message(), "Failed to finalize WAV file: disk full");
        assert_eq!(
            session_err.to_string(),
            "capture failed in stop_recording: Failed to finalize WAV file: disk full"
        );
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InvalidState).unwrap();
        assert_eq!(json, "\"invalid_state\"");
    }
}
