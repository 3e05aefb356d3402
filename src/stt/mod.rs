//! Speech-to-text provider boundary.
//!
//! The `TranscriptionClient` trait allows swapping implementations
//! (external HTTP provider vs mock).

pub mod filter;
pub mod http;

use crate::error::{Result, VoxloopError};
use crate::pipeline::frame::Utterance;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

pub use http::HttpSttClient;

/// Transcription of one utterance.
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Id of the utterance this text came from.
    pub utterance_id: u64,
    /// Raw provider text, before any acceptance filtering.
    pub text: String,
    /// Language code the provider transcribed against.
    pub language: String,
    /// Provider confidence, when reported.
    pub confidence: Option<f32>,
}

/// Trait for speech-to-text transcription.
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    /// Transcribe a sealed utterance to text.
    ///
    /// Implementations must bound their own latency: a hung provider
    /// surfaces as `SttTimeout`, never as an indefinitely stalled turn.
    async fn transcribe(&self, utterance: &Utterance) -> Result<Transcript>;
}

/// Mock transcription client for testing.
///
/// Responses are scripted per call; once the script runs out the default
/// response repeats. An optional delay simulates provider latency.
#[derive(Debug, Clone)]
pub struct MockTranscriptionClient {
    responses: Arc<std::sync::Mutex<VecDeque<String>>>,
    default_response: String,
    should_fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicU32>,
}

impl MockTranscriptionClient {
    /// Create a new mock with a fixed default response.
    pub fn new(response: &str) -> Self {
        Self {
            responses: Arc::new(std::sync::Mutex::new(VecDeque::new())),
            default_response: response.to_string(),
            should_fail: false,
            delay: None,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Script responses returned in order before the default kicks in.
    pub fn with_responses(self, responses: Vec<&str>) -> Self {
        *self.responses.lock().unwrap() =
            responses.into_iter().map(String::from).collect();
        self
    }

    /// Configure the mock to fail every call.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Simulate provider latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of transcription calls made.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionClient for MockTranscriptionClient {
    async fn transcribe(&self, utterance: &Utterance) -> Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail {
            return Err(VoxloopError::SttProvider {
                message: "mock transcription failure".to_string(),
            });
        }

        let text = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone());

        Ok(Transcript {
            utterance_id: utterance.id,
            text,
            language: "en-US".to_string(),
            confidence: Some(1.0),
        })
    }
}
