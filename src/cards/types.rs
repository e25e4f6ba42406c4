//! Card types and request limits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Maximum accepted image payload: 10 MiB
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Maximum accepted context text length in characters
pub const MAX_TEXT_CHARS: usize = 1000;

// ============================================================================
// Card
// ============================================================================

/// A flashcard for one word, possibly in a specific sentence context.
///
/// Created once by the generator and immutable afterwards; never persisted.
/// Field names are part of the client wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<i64>,
    pub word: String,
    pub t_word: Option<String>,
    pub description: Option<String>,
    pub pronunciation: Option<String>,
    pub part_of_speech: Option<String>,
    /// Comma-joined synonyms in the learning language.
    pub synonyms: Option<String>,
    pub sentence: Option<String>,
    pub t_sentence: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Card produced when generation fails for a single word: the word is
    /// preserved, the translation slot carries the error marker and the
    /// description carries the error text.
    pub fn degraded(word: &str, error: &str) -> Self {
        Self {
            card_id: None,
            word: word.to_string(),
            t_word: Some("Error".to_string()),
            description: Some(error.to_string()),
            pronunciation: None,
            part_of_speech: None,
            synonyms: None,
            sentence: None,
            t_sentence: None,
            created_at: Utc::now(),
        }
    }

    /// Whether this card carries an error marker instead of content.
    pub fn is_degraded(&self) -> bool {
        self.t_word.as_deref() == Some("Error")
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that invalidate a whole card-creation request.
///
/// Failures local to a single (word, sentence) pair never surface here; they
/// become degraded cards instead.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("Empty image content")]
    EmptyImage,

    #[error("Image size {size} exceeds maximum limit of {max} bytes")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Invalid image format")]
    InvalidImage,

    #[error("Empty text content")]
    EmptyText,

    #[error("Text length {len} exceeds maximum limit of {max} characters")]
    TextTooLong { len: usize, max: usize },

    #[error("Words must be a non-empty list")]
    NoWords,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),
}

impl CardError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Extraction(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
