//! HTTP surface tests for the chat endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{json, Value};
use uuid::Uuid;

use flashcard_server::config::{Config, GeminiConfig, ServerConfig};
use flashcard_server::extract::{ExtractError, TextExtractor};
use flashcard_server::gemini::{BackendError, GenerationBackend, Message};
use flashcard_server::routes;
use flashcard_server::state::AppState;

struct ScriptedBackend {
    reply: String,
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, _history: &[Message]) -> Result<String, BackendError> {
        Ok(self.reply.clone())
    }
}

struct StaticExtractor;

#[async_trait]
impl TextExtractor for StaticExtractor {
    async fn is_available(&self) -> bool {
        true
    }

    async fn extract(&self, _image: &image::DynamicImage) -> Result<String, ExtractError> {
        Ok(String::new())
    }
}

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        gemini: GeminiConfig {
            api_key: "test-key".to_string(),
            model: "gemini-2.0-flash".to_string(),
            endpoint: "http://localhost:9".to_string(),
        },
    }
}

fn server(reply: &str) -> TestServer {
    let state = AppState::new(
        test_config(),
        Arc::new(ScriptedBackend {
            reply: reply.to_string(),
        }),
        Arc::new(StaticExtractor),
    );
    TestServer::new(routes::router().with_state(state)).unwrap()
}

#[tokio::test]
async fn health_reports_service() {
    let server = server("ok");

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "flash-card-api");
}

#[tokio::test]
async fn check_sentence_opens_session() {
    let server = server("Nice sentence!");

    let response = server
        .post("/api/chat/check-sentence")
        .json(&json!({
            "word": "cat",
            "sentence": "I saw a cat yesterday.",
            "n_language": "Turkish",
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"], "Nice sentence!");

    let session_id = body["session_id"].as_str().expect("session id present");
    Uuid::parse_str(session_id).expect("session id is a uuid");
}

#[tokio::test]
async fn continue_round_trip() {
    let server = server("Keep going!");

    let opened = server
        .post("/api/chat/check-sentence")
        .json(&json!({
            "word": "cat",
            "sentence": "I saw a cat.",
            "n_language": "Turkish",
        }))
        .await;
    let session_id = opened.json::<Value>()["session_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = server
        .post("/api/chat/continue")
        .json(&json!({
            "session_id": session_id,
            "message": "What about plurals?",
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"], "Keep going!");
    assert_eq!(body["session_id"], session_id.as_str());
}

#[tokio::test]
async fn continue_unknown_session_is_informational() {
    let server = server("unused");

    let response = server
        .post("/api/chat/continue")
        .json(&json!({
            "session_id": Uuid::new_v4().to_string(),
            "message": "hello?",
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert!(body["data"]
        .as_str()
        .unwrap()
        .contains("Session not found or expired"));
}
