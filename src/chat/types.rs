//! Chat session types

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Idle time after which a session is removed.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(300);

/// How often the reaper scans for idle sessions.
pub const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Reply sent when a client continues an unknown or expired session.
pub const SESSION_NOT_FOUND_REPLY: &str =
    "Session not found or expired. Please start a new chat session.";

/// Chat session errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The session id is unknown: it expired or never existed. This is an
    /// expected, recoverable condition; the route layer renders it as an
    /// informational reply rather than a failure.
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}
