//! HTTP transcription client.
//!
//! POSTs the utterance as a WAV body to the configured endpoint and
//! expects `{"text": "..."}` back. The whole exchange is bounded by a
//! single timeout so a hung provider fails the turn as `SttTimeout`
//! instead of stalling it.

use crate::audio::wav::encode_wav;
use crate::defaults;
use crate::error::{Result, VoxloopError};
use crate::pipeline::frame::Utterance;
use crate::stt::{Transcript, TranscriptionClient};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Wire format of the provider response.
#[derive(Debug, Deserialize)]
struct SttResponse {
    text: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Transcription client backed by an external HTTP provider.
pub struct HttpSttClient {
    client: reqwest::Client,
    endpoint: String,
    language: String,
    timeout: Duration,
}

impl HttpSttClient {
    /// Create a new client for the given endpoint.
    pub fn new(endpoint: &str, language: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            language: language.to_string(),
            timeout: Duration::from_millis(defaults::STT_TIMEOUT_MS),
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request(&self, utterance: &Utterance) -> Result<Transcript> {
        let wav = encode_wav(&utterance.samples, utterance.sample_rate)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .query(&[("language", self.language.as_str())])
            .body(wav)
            .send()
            .await
            .map_err(|e| VoxloopError::SttProvider {
                message: format!("request failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(VoxloopError::SttProvider {
                message: format!("provider returned status {}", response.status()),
            });
        }

        let payload: SttResponse =
            response.json().await.map_err(|e| VoxloopError::SttProvider {
                message: format!("invalid provider response: {e}"),
            })?;

        Ok(Transcript {
            utterance_id: utterance.id,
            text: payload.text,
            language: self.language.clone(),
            confidence: payload.confidence,
        })
    }
}

#[async_trait]
impl TranscriptionClient for HttpSttClient {
    async fn transcribe(&self, utterance: &Utterance) -> Result<Transcript> {
        match tokio::time::timeout(self.timeout, self.request(utterance)).await {
            Ok(result) => result,
            Err(_) => Err(VoxloopError::SttTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
