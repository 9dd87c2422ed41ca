use super::state::AppState;
use crate::error::{ErrorKind, SessionError};
use crate::session::{SessionSnapshot, TakeId, TakeView};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PlayTakeRequest {
    /// Overrides the configured loop policy for this play
    pub looping: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustPitchRequest {
    /// Pitch shift in semitones (clamped to [-12, 12])
    pub semitones: f32,
}

#[derive(Debug, Deserialize)]
pub struct SetVolumeRequest {
    /// Master volume (clamped to [0, 1])
    pub volume: f32,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub status: String,
    pub take: Option<TakeView>,
}

#[derive(Debug, Serialize)]
pub struct PitchResponse {
    pub take_id: TakeId,
    pub semitones: f32,
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    pub volume: f32,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

// ============================================================================
// Error mapping
// ============================================================================

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::DeviceUnavailable | ErrorKind::ResourceUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ErrorKind::CaptureFailed | ErrorKind::PlaybackFailed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: SessionError) -> Response {
    (
        status_for(err.kind()),
        Json(ErrorResponse {
            error: err.to_string(),
            kind: err.kind(),
        }),
    )
        .into_response()
}

/// Answer with the session as it stands after a successful command
async fn snapshot_response(state: &AppState) -> Response {
    match state.session.snapshot().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn respond(state: &AppState, result: Result<(), SessionError>) -> Response {
    match result {
        Ok(()) => snapshot_response(state).await,
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
/// Full session state
pub async fn get_session(State(state): State<AppState>) -> Response {
    snapshot_response(&state).await
}

/// GET /takes
/// Takes in creation order
pub async fn list_takes(State(state): State<AppState>) -> Response {
    match state.session.snapshot().await {
        Ok(SessionSnapshot { takes, .. }) => (StatusCode::OK, Json(takes)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /session/record/start
pub async fn start_recording(State(state): State<AppState>) -> Response {
    info!("Start recording requested");
    let result = state.session.start_recording().await;
    respond(&state, result).await
}

/// POST /session/record/stop
/// Stop recording; returns the new take, if one was saved
pub async fn stop_recording(State(state): State<AppState>) -> Response {
    info!("Stop recording requested");

    let take_id = match state.session.stop_recording().await {
        Ok(take_id) => take_id,
        Err(e) => return error_response(e),
    };

    let snapshot = match state.session.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => return error_response(e),
    };

    let take = take_id.and_then(|id| snapshot.takes.into_iter().find(|take| take.id == id));
    let status = if take.is_some() { "saved" } else { "idle" };

    (
        StatusCode::OK,
        Json(StopRecordingResponse {
            status: status.to_string(),
            take,
        }),
    )
        .into_response()
}

/// POST /takes/:take_id/play
/// Play a take from the start (optional body: {"looping": bool})
pub async fn play_take(
    State(state): State<AppState>,
    Path(take_id): Path<TakeId>,
    body: Option<Json<PlayTakeRequest>>,
) -> Response {
    let looping = body.and_then(|Json(req)| req.looping);
    let result = state.session.play_take(take_id, looping).await;
    respond(&state, result).await
}

/// POST /takes/:take_id/toggle
/// Play, pause or resume, whichever the take's play control offers
pub async fn toggle_take(State(state): State<AppState>, Path(take_id): Path<TakeId>) -> Response {
    let result = state.session.toggle_playback(take_id).await;
    respond(&state, result).await
}

/// PUT /takes/:take_id/pitch
pub async fn adjust_pitch(
    State(state): State<AppState>,
    Path(take_id): Path<TakeId>,
    Json(req): Json<AdjustPitchRequest>,
) -> Response {
    match state.session.adjust_pitch(take_id, req.semitones).await {
        Ok(semitones) => {
            (StatusCode::OK, Json(PitchResponse { take_id, semitones })).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /takes/:take_id
pub async fn delete_take(State(state): State<AppState>, Path(take_id): Path<TakeId>) -> Response {
    info!("Delete requested for take {}", take_id);
    let result = state.session.delete_take(take_id).await;
    respond(&state, result).await
}

/// POST /playback/pause
pub async fn pause_playback(State(state): State<AppState>) -> Response {
    let result = state.session.pause_playback().await;
    respond(&state, result).await
}

/// POST /playback/resume
pub async fn resume_playback(State(state): State<AppState>) -> Response {
    let result = state.session.resume_playback().await;
    respond(&state, result).await
}

/// POST /playback/stop
pub async fn stop_playback(State(state): State<AppState>) -> Response {
    let result = state.session.stop_playback().await;
    respond(&state, result).await
}

/// PUT /volume
pub async fn set_volume(
    State(state): State<AppState>,
    Json(req): Json<SetVolumeRequest>,
) -> Response {
    match state.session.set_master_volume(req.volume).await {
        Ok(volume) => (StatusCode::OK, Json(VolumeResponse { volume })).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
