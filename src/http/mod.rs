//! HTTP API server for controlling recording sessions and browsing notes:
//! - POST /sessions/start - Start a new recording
//! - POST /sessions/:id/stop - Stop a recording and save the note
//! - GET /sessions/:id/status - Query session status
//! - GET /sessions/:id/transcript - Get accumulated transcript
//! - GET /sessions/:id/subtitle - Get the rolling caption
//! - GET/PATCH/DELETE /notes... - Note CRUD
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
