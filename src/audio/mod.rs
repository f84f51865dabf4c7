pub mod capture;
pub mod chunk;
pub mod encode;
pub mod mixer;
pub mod recorder;

pub use capture::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureSource, FileCaptureBackend,
    MediaTrack, TrackKind,
};
pub use chunk::{AudioChunk, SessionAudioBuffer};
pub use encode::{ChunkEncoder, ChunkEncoderFactory, FALLBACK_ENCODING, PCM_ENCODING, WAV_ENCODING};
pub use mixer::{MixerConfig, MixerGraph};
pub use recorder::{ChunkRecorder, RecorderConfig};
