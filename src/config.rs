use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
    pub summarization: SummarizationConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Directory where finalized session audio is stored
    pub recordings_path: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Cadence of chunk production during live recording
    pub chunk_interval_ms: u64,
    /// Requested chunk encoding; falls back to the default when unsupported
    pub preferred_encoding: String,
    /// Audio file replayed as the display-audio source (native capture needs a platform bridge)
    pub capture_source: Option<String>,
    /// Optional second file replayed as the microphone source
    pub microphone_source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Maximum chunks waiting in the queue before the oldest are discarded
    pub max_pending_chunks: usize,
    /// Delay between drain iterations to smooth request rate
    pub pacing_ms: u64,
    /// Delay after a failed chunk before continuing
    pub failure_backoff_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct SummarizationConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct LimitsConfig {
    pub create_note_max: u32,
    pub create_note_window_secs: u64,
    pub transcribe_chunk_max: u32,
    pub transcribe_chunk_window_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
