//! HTTP API server for external control (presentation layer)
//!
//! This module provides a REST API over one karaoke session:
//! - POST /session/record/start, /session/record/stop - Record a take
//! - GET /session, GET /takes - Query session state
//! - POST /takes/:id/play, /takes/:id/toggle - Play a take
//! - PUT /takes/:id/pitch, DELETE /takes/:id - Edit the catalog
//! - POST /playback/pause|resume|stop - Transport of the loaded take
//! - PUT /volume - Master volume
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
