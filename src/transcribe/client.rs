use anyhow::{Context, Result};
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::audio::AudioChunk;
use crate::error::TranscribeError;
use crate::notes::{FixedWindowLimiter, LimitedAction};

/// Output of transcribing one chunk. Consumed immediately by the transcript
/// assembler and not retained.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    pub text: String,
    pub language: Option<String>,
}

/// Transcription endpoint boundary
#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, chunk: &AudioChunk) -> Result<TranscriptionResult, TranscribeError>;
}

#[derive(Serialize)]
struct TranscribeRequest<'a> {
    audio_base64: String,
    encoding: &'a str,
}

#[derive(Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: Option<String>,
}

/// HTTP client for the remote transcription endpoint.
///
/// Chunk payloads travel base64-encoded with their declared encoding. A 429
/// response maps to the rate-limit error; every other non-success response
/// and transport failure (including the request timeout) is a generic
/// per-chunk failure.
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranscriber {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build transcription HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait::async_trait]
impl SpeechToText for HttpTranscriber {
    async fn transcribe(&self, chunk: &AudioChunk) -> Result<TranscriptionResult, TranscribeError> {
        let request = TranscribeRequest {
            audio_base64: base64::engine::general_purpose::STANDARD.encode(&chunk.data),
            encoding: &chunk.encoding,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(TranscribeError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Endpoint { status, message });
        }

        let parsed: TranscribeResponse = response.json().await?;

        debug!(
            "Chunk {} transcribed: {} chars",
            chunk.index,
            parsed.text.len()
        );

        Ok(TranscriptionResult {
            text: parsed.text,
            language: parsed.language.filter(|l| !l.is_empty()),
        })
    }
}

/// Decorator that applies the platform's fixed-window chunk-transcription
/// limit before each call, the same check the persistence side enforces.
/// An exhausted window reads as a rate-limit rejection without spending a
/// request on the endpoint.
pub struct RateLimitedTranscriber {
    inner: Arc<dyn SpeechToText>,
    limiter: Arc<FixedWindowLimiter>,
    user_id: String,
}

impl RateLimitedTranscriber {
    pub fn new(
        inner: Arc<dyn SpeechToText>,
        limiter: Arc<FixedWindowLimiter>,
        user_id: String,
    ) -> Self {
        Self {
            inner,
            limiter,
            user_id,
        }
    }
}

#[async_trait::async_trait]
impl SpeechToText for RateLimitedTranscriber {
    async fn transcribe(&self, chunk: &AudioChunk) -> Result<TranscriptionResult, TranscribeError> {
        if !self
            .limiter
            .check(&self.user_id, LimitedAction::TranscribeChunk)
            .await
        {
            return Err(TranscribeError::RateLimited);
        }

        self.inner.transcribe(chunk).await
    }
}
