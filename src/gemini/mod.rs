//! Generation backend boundary
//!
//! Everything that talks to the Gemini API lives here: the wire client, the
//! backend trait the rest of the crate programs against, and the
//! conversation history type for multi-turn chat.

mod client;
mod conversation;

pub use client::{BackendError, GeminiClient, GenerationBackend};
pub use conversation::{Conversation, Message, Role};

#[cfg(test)]
pub use client::MockBackend;
