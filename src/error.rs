//! Error taxonomy for the recording pipeline.
//!
//! Session-lifecycle failures (acquisition, encoding negotiation, finalize)
//! surface to the caller; per-chunk transcription failures stay inside the
//! transcription queue and never propagate past it.

use thiserror::Error;

/// Failure to acquire audio sources from the capture facility.
///
/// Fatal to starting a session: nothing is partially started.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("capture permission denied")]
    PermissionDenied,

    #[error("no audio source available")]
    NoAudioSource,

    #[error("capture backend unavailable: {0}")]
    Unavailable(String),

    #[error("failed to acquire capture source: {0}")]
    Backend(String),
}

/// Failure to negotiate or run a chunk encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Neither the requested encoding nor the documented fallback is
    /// supported on this host.
    #[error("no supported chunk encoding (requested {requested}, fallback {fallback})")]
    Unsupported { requested: String, fallback: String },

    #[error("chunk encoding failed: {0}")]
    Encode(#[from] hound::Error),
}

/// Failure to transcribe a single chunk.
///
/// Always non-fatal to the pipeline: the chunk's text is dropped and the
/// queue continues. Rate-limit rejections are kept distinguishable from
/// generic failures so callers can tell the user to wait.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("transcription rate limit exceeded")]
    RateLimited,

    #[error("transcription endpoint returned {status}: {message}")]
    Endpoint { status: u16, message: String },

    #[error("transcription request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failure to complete a session at stop time (upload or persistence).
///
/// The in-memory transcript and timer state survive a finalize failure, so
/// the session can be asked to finalize again without re-recording.
#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("note creation rate limit exceeded")]
    RateLimited,

    #[error("failed to store session audio: {0}")]
    Upload(String),

    #[error("failed to persist note: {0}")]
    Persist(String),
}

/// Top-level session lifecycle error.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("recording already active")]
    AlreadyRecording,

    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    Encoding(#[from] EncodeError),

    #[error(transparent)]
    Finalize(#[from] FinalizeError),
}
