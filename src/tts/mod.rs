//! Text-to-speech provider boundary.
//!
//! Synthesizers return WAV bytes; the player (see [`player`]) owns the
//! cooldown, decoding, and playback.

pub mod player;

use crate::error::{Result, VoxloopError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

pub use player::{PlayerConfig, SpeakOutcome, SpeechPlayer};

/// Voice parameters forwarded to the synthesis provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSettings {
    /// Provider voice identifier.
    pub voice_id: String,
    /// Language code.
    pub language_code: String,
    /// Speaking rate multiplier (1.0 = normal).
    pub speaking_rate: f64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice_id: "default".to_string(),
            language_code: crate::defaults::DEFAULT_LANGUAGE.to_string(),
            speaking_rate: crate::defaults::SPEAKING_RATE,
        }
    }
}

/// Trait for speech synthesis providers.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech for the given text; returns WAV bytes.
    async fn synthesize(&self, text: &str, voice: &VoiceSettings) -> Result<Vec<u8>>;
}

/// Wire format of the synthesis request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TtsRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    language_code: &'a str,
    speaking_rate: f64,
}

/// Wire format of the indirect (URL) synthesis response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TtsUrlResponse {
    audio_url: String,
}

/// Synthesis client backed by an external HTTP provider.
///
/// Accepts either a direct `audio/*` body or a JSON `{"audioUrl": ...}`
/// indirection, which is fetched with a second request.
pub struct HttpTtsClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTtsClient {
    /// Create a new client for the given endpoint.
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    async fn fetch_audio_url(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| VoxloopError::Tts {
                message: format!("audio fetch failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(VoxloopError::Tts {
                message: format!("audio fetch returned status {}", response.status()),
            });
        }

        Ok(response
            .bytes()
            .await
            .map_err(|e| VoxloopError::Tts {
                message: format!("audio fetch failed: {e}"),
            })?
            .to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpTtsClient {
    async fn synthesize(&self, text: &str, voice: &VoiceSettings) -> Result<Vec<u8>> {
        let body = TtsRequest {
            text,
            voice_id: &voice.voice_id,
            language_code: &voice.language_code,
            speaking_rate: voice.speaking_rate,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| VoxloopError::Tts {
                message: format!("request failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(VoxloopError::Tts {
                message: format!("provider returned status {}", response.status()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type.starts_with("audio/") {
            return Ok(response
                .bytes()
                .await
                .map_err(|e| VoxloopError::Tts {
                    message: format!("audio read failed: {e}"),
                })?
                .to_vec());
        }

        let payload: TtsUrlResponse =
            response.json().await.map_err(|e| VoxloopError::Tts {
                message: format!("invalid provider response: {e}"),
            })?;

        self.fetch_audio_url(&payload.audio_url).await
    }
}

/// Mock synthesizer for testing.
///
/// Returns a short valid WAV payload and counts synthesis calls, which is
/// what the cooldown tests assert against.
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    samples_per_call: usize,
    should_fail: bool,
    calls: Arc<AtomicU32>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            samples_per_call: 1600,
            should_fail: false,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Size of the synthesized payload in samples (at 16kHz).
    pub fn with_samples_per_call(mut self, samples: usize) -> Self {
        self.samples_per_call = samples;
        self
    }

    /// Configure the mock to fail every call.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of synthesis requests actually issued.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, _text: &str, _voice: &VoiceSettings) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(VoxloopError::Tts {
                message: "mock synthesis failure".to_string(),
            });
        }

        crate::audio::wav::encode_wav(&vec![2000i16; self.samples_per_call], 16000)
    }
}
