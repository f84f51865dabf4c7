use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Title and summary derived from a full transcript
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryOutcome {
    pub title: String,
    pub summary: String,
}

/// Summarization endpoint boundary
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        transcript: &str,
        language_hint: Option<&str>,
    ) -> Result<SummaryOutcome>;
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    transcript: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_hint: Option<&'a str>,
}

/// HTTP client for the remote summarization endpoint
pub struct HttpSummarizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSummarizer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build summarization HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait::async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(
        &self,
        transcript: &str,
        language_hint: Option<&str>,
    ) -> Result<SummaryOutcome> {
        let request = SummarizeRequest {
            transcript,
            language_hint,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("Summarization request failed")?
            .error_for_status()
            .context("Summarization endpoint returned an error")?;

        let outcome: SummaryOutcome = response
            .json()
            .await
            .context("Failed to parse summarization response")?;

        info!("Summary created: {}", outcome.title);

        Ok(outcome)
    }
}
