use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session state
        .route("/session", get(handlers::get_session))
        // Recording control
        .route("/session/record/start", post(handlers::start_recording))
        .route("/session/record/stop", post(handlers::stop_recording))
        // Takes
        .route("/takes", get(handlers::list_takes))
        .route("/takes/:take_id", delete(handlers::delete_take))
        .route("/takes/:take_id/play", post(handlers::play_take))
        .route("/takes/:take_id/toggle", post(handlers::toggle_take))
        .route("/takes/:take_id/pitch", put(handlers::adjust_pitch))
        // Transport of the loaded take
        .route("/playback/pause", post(handlers::pause_playback))
        .route("/playback/resume", post(handlers::resume_playback))
        .route("/playback/stop", post(handlers::stop_playback))
        // Shared output volume
        .route("/volume", put(handlers::set_volume))
        // The presentation layer is served from another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
