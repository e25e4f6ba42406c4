//! Route modules for the Flashcard Server

pub mod cards;
pub mod chat;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Assemble the full application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/cards", cards::router())
        .nest("/api/chat", chat::router())
}
