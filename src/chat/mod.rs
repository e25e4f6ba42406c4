//! Sentence-feedback chat
//!
//! Short tutoring conversations about a learner's sentence, held in memory
//! per session and expired by a background reaper. Nothing survives a
//! process restart.

mod store;
mod types;

pub use store::SessionStore;
pub use types::{ChatError, REAP_INTERVAL, SESSION_NOT_FOUND_REPLY, SESSION_TIMEOUT};
