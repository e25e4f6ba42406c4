//! Generation backend client
//!
//! Defines the backend trait and the Gemini REST implementation. The reply
//! is free-form text: JSON-ness is a request intent, not a protocol
//! guarantee, so callers decode defensively.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::conversation::Message;
use crate::config::GeminiConfig;

/// Timeout applied to every generation request. A hung call is downgraded by
/// the caller once this elapses; there is no retry.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the generation backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("backend reply contained no text")]
    EmptyReply,
}

/// Text generation backend
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a reply for the given message history.
    ///
    /// The backend holds no state between calls; the full history is
    /// supplied every time.
    async fn generate(&self, history: &[Message]) -> Result<String, BackendError>;
}

/// Gemini REST API client
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<WireContent<'a>>,
}

#[derive(Serialize)]
struct WireContent<'a> {
    role: &'static str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, history: &[Message]) -> Result<String, BackendError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);

        let request = GenerateContentRequest {
            contents: history
                .iter()
                .map(|message| WireContent {
                    role: message.role.as_str(),
                    parts: vec![WirePart {
                        text: &message.text,
                    }],
                })
                .collect(),
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api { status, body });
        }

        let reply: GenerateContentResponse = response.json().await?;

        reply
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .filter(|text| !text.is_empty())
            .ok_or(BackendError::EmptyReply)
    }
}

// ============================================================================
// Test Double
// ============================================================================

/// Scripted backend for testing
#[cfg(test)]
pub struct MockBackend {
    reply: String,
    fail_on: Option<String>,
    fail_always: bool,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockBackend {
    /// Always reply with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            fail_on: None,
            fail_always: false,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Fail every call.
    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            fail_on: None,
            fail_always: true,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Reply with `reply`, except for prompts containing `needle`, which fail.
    pub fn failing_on(reply: impl Into<String>, needle: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            fail_on: Some(needle.into()),
            fail_always: false,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, history: &[Message]) -> Result<String, BackendError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let last = history.last().map(|m| m.text.as_str()).unwrap_or("");
        let should_fail = self.fail_always
            || self
                .fail_on
                .as_deref()
                .is_some_and(|needle| last.contains(needle));

        if should_fail {
            return Err(BackendError::Api {
                status: 500,
                body: "mock backend failure".to_string(),
            });
        }

        Ok(self.reply.clone())
    }
}
