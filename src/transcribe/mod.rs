//! Remote transcription: endpoint client and the ordered chunk queue

mod client;
mod queue;

pub use client::{HttpTranscriber, RateLimitedTranscriber, SpeechToText, TranscriptionResult};
pub use queue::{QueueConfig, TranscriptionQueue};
