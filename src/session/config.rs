use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::PCM_ENCODING;

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Caller identity used for rate limiting
    pub user_id: String,

    /// Cadence of chunk production during the session
    pub chunk_interval: Duration,

    /// Whether to acquire and mix a microphone track alongside the display
    pub mix_microphone: bool,

    /// Requested chunk encoding (subject to the documented fallback)
    pub preferred_encoding: String,

    /// Sample rate for the mixed stream
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            user_id: "local".to_string(),
            chunk_interval: Duration::from_secs(5),
            mix_microphone: true,
            preferred_encoding: PCM_ENCODING.to_string(),
            sample_rate: 16000,
            channels: 1,
        }
    }
}
