//! Chat routes
//!
//! Endpoints:
//! - POST /api/chat/check-sentence - analyze a learner's sentence, open a session
//! - POST /api/chat/continue - continue an existing session
//!
//! The conversational surface always answers with some text in the same
//! envelope: generation failures and unknown sessions become informational
//! replies, never errors, because the conversation UX must continue.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatError, SESSION_NOT_FOUND_REPLY};
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SentenceRequest {
    pub word: String,
    pub sentence: String,
    pub n_language: String,
    #[serde(default = "default_learning_language")]
    pub l_language: String,
}

fn default_learning_language() -> String {
    "English".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ContinueRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub status: ResponseStatus,
    pub message: String,
    pub data: Option<String>,
    pub session_id: Option<String>,
}

// ============================================================================
// Router
// ============================================================================

/// Create the chat router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/check-sentence", post(check_sentence))
        .route("/continue", post(continue_chat))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/chat/check-sentence
async fn check_sentence(
    State(state): State<AppState>,
    Json(request): Json<SentenceRequest>,
) -> Json<ChatResponse> {
    tracing::info!(word = %request.word, "Starting sentence analysis");

    let (session_id, reply) = state
        .sessions()
        .open(
            &request.word,
            &request.sentence,
            &request.n_language,
            &request.l_language,
        )
        .await;

    Json(ChatResponse {
        status: ResponseStatus::Success,
        message: "Sentence analyzed successfully".to_string(),
        data: Some(reply),
        session_id: Some(session_id),
    })
}

/// POST /api/chat/continue
async fn continue_chat(
    State(state): State<AppState>,
    Json(request): Json<ContinueRequest>,
) -> Json<ChatResponse> {
    tracing::info!(session_id = %request.session_id, "Continuing chat session");

    let reply = match state
        .sessions()
        .resume(&request.session_id, &request.message)
        .await
    {
        Ok(reply) => reply,
        // Expected condition: the client is told to start over through the
        // normal reply channel.
        Err(ChatError::SessionNotFound(_)) => SESSION_NOT_FOUND_REPLY.to_string(),
    };

    Json(ChatResponse {
        status: ResponseStatus::Success,
        message: "Chat continued successfully".to_string(),
        data: Some(reply),
        session_id: Some(request.session_id),
    })
}
