//! Chat/LLM backend boundary.
//!
//! One transcript in, one reply out. No retries: a failed call surfaces
//! `Response` and the turn fails with a user-visible message.

use crate::error::{Result, VoxloopError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Trait for the response backend.
#[async_trait]
pub trait ResponseClient: Send + Sync {
    /// Send transcript text, receive reply text.
    async fn respond(&self, text: &str) -> Result<String>;
}

/// Wire format of the request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    message: &'a str,
    design_id: &'a str,
}

/// Wire format of the response body.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    reply: String,
}

/// Response client backed by an external chat/LLM HTTP endpoint.
pub struct HttpResponseClient {
    client: reqwest::Client,
    endpoint: String,
    design_id: String,
}

impl HttpResponseClient {
    /// Create a new client for the given endpoint and design/session id.
    pub fn new(endpoint: &str, design_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            design_id: design_id.to_string(),
        }
    }
}

#[async_trait]
impl ResponseClient for HttpResponseClient {
    async fn respond(&self, text: &str) -> Result<String> {
        let body = ChatRequest {
            message: text,
            design_id: &self.design_id,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| VoxloopError::Response {
                message: format!("request failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(VoxloopError::Response {
                message: format!("backend returned status {}", response.status()),
            });
        }

        let payload: ChatResponse =
            response.json().await.map_err(|e| VoxloopError::Response {
                message: format!("invalid backend response: {e}"),
            })?;

        Ok(payload.reply)
    }
}

/// Mock response client for testing.
#[derive(Debug, Clone)]
pub struct MockResponseClient {
    replies: Arc<std::sync::Mutex<VecDeque<String>>>,
    default_reply: String,
    should_fail: bool,
    calls: Arc<AtomicU32>,
}

impl MockResponseClient {
    /// Create a new mock with a fixed default reply.
    pub fn new(reply: &str) -> Self {
        Self {
            replies: Arc::new(std::sync::Mutex::new(VecDeque::new())),
            default_reply: reply.to_string(),
            should_fail: false,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Script replies returned in order before the default kicks in.
    pub fn with_replies(self, replies: Vec<&str>) -> Self {
        *self.replies.lock().unwrap() = replies.into_iter().map(String::from).collect();
        self
    }

    /// Configure the mock to fail every call.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of respond calls made.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResponseClient for MockResponseClient {
    async fn respond(&self, _text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(VoxloopError::Response {
                message: "mock backend failure".to_string(),
            });
        }

        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone()))
    }
}
