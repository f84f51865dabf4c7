pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod notes;
pub mod session;
pub mod transcribe;

pub use audio::{
    AudioChunk, AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureSource, ChunkEncoder,
    ChunkEncoderFactory, ChunkRecorder, MediaTrack, MixerConfig, MixerGraph, RecorderConfig,
    SessionAudioBuffer, TrackKind,
};
pub use config::Config;
pub use error::{AcquireError, EncodeError, FinalizeError, SessionError, TranscribeError};
pub use http::{create_router, AppState};
pub use notes::{
    FixedWindowLimiter, FsMediaStore, HttpSummarizer, InMemoryNoteStore, InMemoryRateLimitStore,
    LimitRule, LimitedAction, MediaStore, Note, NoteDraft, NoteStore, NoteUpdate, RateLimitStore,
    SummaryOutcome, Summarizer,
};
pub use session::{
    recent_speech, RecordingSession, SessionConfig, SessionOutcome, SessionServices, SessionStats,
    SessionTimer, TranscriptState,
};
pub use transcribe::{
    HttpTranscriber, QueueConfig, RateLimitedTranscriber, SpeechToText, TranscriptionQueue,
    TranscriptionResult,
};
