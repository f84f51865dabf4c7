use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notes::Note;

/// Statistics about a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether recording is currently active
    pub is_recording: bool,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Elapsed recording time in whole seconds
    pub elapsed_secs: u64,

    /// Number of audio chunks produced so far
    pub chunks_recorded: usize,

    /// Chunks still waiting in the transcription queue
    pub pending_chunks: usize,

    /// Length of the transcript so far, in characters
    pub transcript_chars: usize,

    /// Latched detected language, if any chunk reported one
    pub detected_language: Option<String>,
}

/// Result of stopping a session.
///
/// `note` is present when this call finalized the session; a stop on a
/// session that was never recording (or was already finalized) carries
/// stats only.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub stats: SessionStats,
    pub note: Option<Note>,
}
