use super::state::AppState;
use crate::audio::{CaptureBackendFactory, CaptureSource};
use crate::error::{AcquireError, FinalizeError, SessionError};
use crate::notes::{Note, NoteUpdate};
use crate::session::{RecordingSession, SessionConfig, SessionOutcome, SessionStats};
use crate::transcribe::QueueConfig;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    #[serde(default)]
    pub session_id: Option<String>,

    /// Mix a microphone track alongside the display audio
    #[serde(default)]
    pub mix_microphone: Option<bool>,

    /// Chunk cadence in milliseconds
    #[serde(default)]
    pub chunk_interval_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub status: String,
    pub stats: SessionStats,
    pub note: Option<Note>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub transcript: String,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubtitleResponse {
    /// Caption text; null while the caption is hidden
    pub subtitle: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn session_error_response(err: SessionError) -> Response {
    let status = match &err {
        SessionError::AlreadyRecording => StatusCode::CONFLICT,
        SessionError::Acquire(AcquireError::PermissionDenied) => StatusCode::FORBIDDEN,
        SessionError::Acquire(_) | SessionError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SessionError::Finalize(FinalizeError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
        SessionError::Finalize(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

/// Caller identity for rate limiting; authentication itself lives upstream
fn user_id_from(headers: &HeaderMap) -> String {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("local")
        .to_string()
}

// ============================================================================
// Session Handlers
// ============================================================================

/// POST /sessions/start
/// Start a new recording session
pub async fn start_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("session-{}", Uuid::new_v4()));

    info!("Starting session: {}", session_id);

    // Check if already recording
    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&session_id) {
            return error_response(
                StatusCode::CONFLICT,
                format!("Session {} is already recording", session_id),
            );
        }
    }

    let audio = &state.config.audio;
    let transcription = &state.config.transcription;

    let config = SessionConfig {
        session_id: session_id.clone(),
        user_id: user_id_from(&headers),
        chunk_interval: Duration::from_millis(
            req.chunk_interval_ms.unwrap_or(audio.chunk_interval_ms),
        ),
        mix_microphone: req
            .mix_microphone
            .unwrap_or(audio.microphone_source.is_some()),
        preferred_encoding: audio.preferred_encoding.clone(),
        sample_rate: audio.sample_rate,
        channels: audio.channels,
    };

    let queue_config = QueueConfig {
        max_pending: transcription.max_pending_chunks,
        pacing: Duration::from_millis(transcription.pacing_ms),
        failure_backoff: Duration::from_millis(transcription.failure_backoff_ms),
    };

    let source = match &audio.capture_source {
        Some(path) => CaptureSource::File {
            display: path.into(),
            microphone: audio.microphone_source.as_ref().map(|p| p.into()),
        },
        None => CaptureSource::Display,
    };

    let backend = match CaptureBackendFactory::create(source) {
        Ok(backend) => backend,
        Err(e) => {
            error!("Failed to create capture backend: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create capture backend: {}", e),
            );
        }
    };

    let session = Arc::new(RecordingSession::new(
        config,
        state.services.clone(),
        queue_config,
    ));

    if let Err(e) = session.start(backend.as_ref()).await {
        error!("Failed to start session {}: {}", session_id, e);
        return session_error_response(e);
    }

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(session_id.clone(), session);
    }

    info!("Session started: {}", session_id);

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id,
            status: "recording".to_string(),
        }),
    )
        .into_response()
}

/// POST /sessions/:session_id/stop
/// Stop recording and finalize the session into a note
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    info!("Stopping session: {}", session_id);

    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&session_id).cloned()
    };

    let Some(session) = session else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Session {} not found", session_id),
        );
    };

    match session.stop().await {
        Ok(SessionOutcome { stats, note }) => {
            // Only a finalized session leaves the map; a failed finalize
            // keeps it around so stop can be retried
            let mut sessions = state.sessions.write().await;
            sessions.remove(&session_id);

            (
                StatusCode::OK,
                Json(StopSessionResponse {
                    session_id,
                    status: "stopped".to_string(),
                    stats,
                    note,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to stop session {}: {}", session_id, e);
            session_error_response(e)
        }
    }
}

/// GET /sessions/:session_id/status
pub async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&session_id) {
        Some(session) => (StatusCode::OK, Json(session.stats())).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Session {} not found", session_id),
        ),
    }
}

/// GET /sessions/:session_id/transcript
/// Transcript accumulated so far
pub async fn session_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&session_id) {
        Some(session) => {
            let (transcript, language) = session.transcript_snapshot();
            (
                StatusCode::OK,
                Json(TranscriptResponse {
                    transcript,
                    language,
                }),
            )
                .into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Session {} not found", session_id),
        ),
    }
}

/// GET /sessions/:session_id/subtitle
/// Rolling caption derived from the transcript
pub async fn session_subtitle(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&session_id) {
        Some(session) => (
            StatusCode::OK,
            Json(SubtitleResponse {
                subtitle: session.subtitle(),
            }),
        )
            .into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Session {} not found", session_id),
        ),
    }
}

// ============================================================================
// Note Handlers
// ============================================================================

/// GET /notes
/// List all notes, newest first
pub async fn list_notes(State(state): State<AppState>) -> impl IntoResponse {
    match state.services.notes.list().await {
        Ok(notes) => (StatusCode::OK, Json(notes)).into_response(),
        Err(e) => {
            error!("Failed to list notes: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /notes/:note_id
pub async fn get_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.services.notes.get(note_id).await {
        Ok(Some(note)) => (StatusCode::OK, Json(note)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Note {} not found", note_id),
        ),
        Err(e) => {
            error!("Failed to fetch note {}: {}", note_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// PATCH /notes/:note_id
/// Update title and/or summary
pub async fn update_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Json(update): Json<NoteUpdate>,
) -> impl IntoResponse {
    match state.services.notes.update(note_id, update).await {
        Ok(Some(note)) => (StatusCode::OK, Json(note)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Note {} not found", note_id),
        ),
        Err(e) => {
            error!("Failed to update note {}: {}", note_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// DELETE /notes/:note_id
pub async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.services.notes.delete(note_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            format!("Note {} not found", note_id),
        ),
        Err(e) => {
            error!("Failed to delete note {}: {}", note_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
