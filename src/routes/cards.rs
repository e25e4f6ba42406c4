//! Card creation routes
//!
//! Endpoints:
//! - POST /api/cards/image - create cards from a photographed page (multipart)
//! - POST /api/cards/text - create cards from typed text
//!
//! Both return the plain list of cards. A batch that partially failed still
//! returns success with however many cards it managed to build; only
//! request-level problems (bad input, bad image) produce an error envelope.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::cards::{Card, CardError};
use crate::state::AppState;

/// Request body bound for the multipart route. Generous on purpose: the
/// image size limit proper is enforced by the card service so oversized
/// uploads get a typed error instead of a framework rejection.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// Error Response
// ============================================================================

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for CardError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = match &self {
            CardError::EmptyImage => "EMPTY_IMAGE",
            CardError::ImageTooLarge { .. } => "IMAGE_TOO_LARGE",
            CardError::InvalidImage => "INVALID_IMAGE",
            CardError::EmptyText => "EMPTY_TEXT",
            CardError::TextTooLong { .. } => "TEXT_TOO_LONG",
            CardError::NoWords => "NO_WORDS",
            CardError::InvalidRequest(_) => "INVALID_REQUEST",
            CardError::Extraction(_) => "EXTRACTION_FAILED",
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Create the cards router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/image", post(create_from_image))
        .route("/text", post(create_from_text))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/cards/image
///
/// Multipart form: `image` (file), repeated `words` fields (comma-separated
/// values accepted too), optional `n_language` / `l_language`.
async fn create_from_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<Card>>, CardError> {
    let mut image: Option<Vec<u8>> = None;
    let mut words: Vec<String> = Vec::new();
    let mut n_language = String::from("Turkish");
    let mut l_language = String::from("English");

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        CardError::InvalidRequest(format!("failed to read multipart field: {e}"))
    })? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => {
                let data = field.bytes().await.map_err(|e| {
                    CardError::InvalidRequest(format!("failed to read image field: {e}"))
                })?;
                image = Some(data.to_vec());
            }
            "words" => {
                let value = field.text().await.map_err(|e| {
                    CardError::InvalidRequest(format!("failed to read words field: {e}"))
                })?;
                words.extend(
                    value
                        .split(',')
                        .map(|word| word.trim().to_string())
                        .filter(|word| !word.is_empty()),
                );
            }
            "n_language" => {
                n_language = field.text().await.map_err(|e| {
                    CardError::InvalidRequest(format!("failed to read n_language field: {e}"))
                })?;
            }
            "l_language" => {
                l_language = field.text().await.map_err(|e| {
                    CardError::InvalidRequest(format!("failed to read l_language field: {e}"))
                })?;
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    let image = image.ok_or_else(|| CardError::InvalidRequest("missing image field".to_string()))?;
    if words.is_empty() {
        return Err(CardError::NoWords);
    }

    tracing::info!(
        bytes = image.len(),
        words = words.len(),
        "Creating cards from image"
    );

    let cards = state
        .cards()
        .create_cards_from_image(&image, &words, &n_language, &l_language)
        .await?;
    Ok(Json(cards))
}

/// Request body for text-based card creation
#[derive(Debug, Deserialize)]
pub struct TextCardRequest {
    pub text: String,
    pub words: Vec<String>,
    #[serde(default = "default_native_language")]
    pub n_language: String,
    #[serde(default = "default_learning_language")]
    pub l_language: String,
}

fn default_native_language() -> String {
    "Turkish".to_string()
}

fn default_learning_language() -> String {
    "English".to_string()
}

/// POST /api/cards/text
async fn create_from_text(
    State(state): State<AppState>,
    Json(request): Json<TextCardRequest>,
) -> Result<Json<Vec<Card>>, CardError> {
    tracing::info!(
        chars = request.text.len(),
        words = request.words.len(),
        "Creating cards from text"
    );

    let cards = state
        .cards()
        .create_cards_from_text(
            &request.text,
            &request.words,
            &request.n_language,
            &request.l_language,
        )
        .await?;
    Ok(Json(cards))
}
