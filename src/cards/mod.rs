//! Flashcard generation
//!
//! One card per (word, context sentence) pair, produced through the
//! generation backend. The orchestration layer turns a batch of words plus
//! a context source into a list of cards with per-item failure isolation.

mod generator;
mod service;
mod types;

pub use generator::CardGenerator;
pub use service::CardService;
pub use types::{Card, CardError, MAX_IMAGE_BYTES, MAX_TEXT_CHARS};
