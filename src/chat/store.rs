//! Chat session store
//!
//! Process-wide registry of active tutoring conversations, shared between
//! request handlers and the background reaper. Entries are locked
//! individually so a slow backend call on one session never blocks the
//! registry, the reaper, or an unrelated session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::types::{ChatError, SESSION_TIMEOUT};
use crate::gemini::{Conversation, GenerationBackend};

struct SessionHandle {
    conversation: Mutex<Conversation>,
    // Never held across an await, so the reaper can always read it.
    last_activity: parking_lot::Mutex<Instant>,
}

impl SessionHandle {
    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_activity.lock())
    }

    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }
}

/// Registry of active chat sessions
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
    backend: Arc<dyn GenerationBackend>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self::with_timeout(backend, SESSION_TIMEOUT)
    }

    /// The timeout is injectable so tests can run with a short one.
    pub fn with_timeout(backend: Arc<dyn GenerationBackend>, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                backend,
                timeout,
            }),
        }
    }

    // ========================================================================
    // Session Lifecycle
    // ========================================================================

    /// Open a new session around a learner's sentence and return the first
    /// piece of feedback.
    ///
    /// The id is always freshly allocated; callers can never supply their
    /// own. A backend failure still opens the session and becomes the reply
    /// text, because the conversation must go on.
    pub async fn open(
        &self,
        word: &str,
        sentence: &str,
        n_language: &str,
        l_language: &str,
    ) -> (String, String) {
        let mut conversation = Conversation::new();
        conversation.push_user(feedback_prompt(word, sentence, n_language, l_language));

        let reply = match self.inner.backend.generate(conversation.messages()).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(word = %word, error = %e, "Sentence feedback generation failed");
                format!("Error providing sentence response: {e}")
            }
        };
        conversation.push_model(reply.clone());

        let session_id = Uuid::new_v4().to_string();
        let handle = Arc::new(SessionHandle {
            conversation: Mutex::new(conversation),
            last_activity: parking_lot::Mutex::new(Instant::now()),
        });

        let mut sessions = self.inner.sessions.write().await;
        sessions.insert(session_id.clone(), handle);
        tracing::info!(
            session_id = %session_id,
            active = sessions.len(),
            "Opened chat session"
        );

        (session_id, reply)
    }

    /// Continue an existing session with a new user message.
    ///
    /// Appends exactly one user/model pair and refreshes the idle timer.
    /// Concurrent calls on the same id serialize on the session's own lock;
    /// the registry lock is released before the backend call.
    pub async fn resume(&self, session_id: &str, message: &str) -> Result<String, ChatError> {
        let handle = {
            let sessions = self.inner.sessions.read().await;
            sessions.get(session_id).cloned()
        }
        .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))?;

        handle.touch();

        let mut conversation = handle.conversation.lock().await;
        conversation.push_user(message);

        let reply = match self.inner.backend.generate(conversation.messages()).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Chat continuation failed");
                format!("Error occurred while continuing the chat: {e}")
            }
        };
        conversation.push_model(reply.clone());
        drop(conversation);

        handle.touch();
        Ok(reply)
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    /// Remove every session idle past the timeout.
    ///
    /// Returns the number of sessions removed.
    pub async fn reap_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = {
            let sessions = self.inner.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, handle)| handle.idle_for(now) > self.inner.timeout)
                .map(|(id, _)| id.clone())
                .collect()
        };

        if expired.is_empty() {
            return 0;
        }

        let mut sessions = self.inner.sessions.write().await;
        let mut removed = 0;
        for id in &expired {
            // A resume may have refreshed the session between the scan and
            // this lock; re-check before removing.
            let still_expired = sessions
                .get(id)
                .is_some_and(|handle| handle.idle_for(Instant::now()) > self.inner.timeout);
            if still_expired {
                sessions.remove(id);
                removed += 1;
                tracing::debug!(session_id = %id, "Session expired and removed");
            }
        }

        if removed > 0 {
            tracing::info!(
                count = removed,
                active = sessions.len(),
                "Cleaned up expired chat sessions"
            );
        }

        removed
    }

    /// Spawn the background reaper on a fixed tick.
    pub fn spawn_reaper(self, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.reap_expired().await;
            }
        })
    }

    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }
}

fn feedback_prompt(word: &str, sentence: &str, n_language: &str, l_language: &str) -> String {
    format!(
        "You are a language teaching assistant. You will analyze the sentence created by the \
         user with a certain word.\n\
         The user's native language is '{n_language}' and they are learning '{l_language}'.\n\
         They used the word '{word}' in the sentence: '{sentence}'. Prepare an answer for the \
         student.\n\
         Your first task is to analyze this sentence. Your response MUST be in the user's \
         native language ('{n_language}').\n\
         1. Start by checking the sentence for grammatical errors and correcting them. Explain \
         the corrections clearly.\n\
         2. Evaluate if the word '{word}' is used correctly in the context of the sentence. If \
         not, explain why and provide a better alternative.\n\
         3. Provide two alternative example sentences using the word '{word}', showing both the \
         '{l_language}' version and its '{n_language}' translation.\n\
         4. After your analysis, ask an open-ended question to encourage the user to continue \
         the conversation."
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::{MockBackend, Role};

    fn store_with_timeout(timeout: Duration) -> SessionStore {
        SessionStore::with_timeout(Arc::new(MockBackend::replying("feedback")), timeout)
    }

    async fn history_len(store: &SessionStore, session_id: &str) -> usize {
        let sessions = store.inner.sessions.read().await;
        let handle = sessions.get(session_id).expect("session should exist");
        let len = handle.conversation.lock().await.len();
        len
    }

    #[tokio::test]
    async fn test_open_allocates_fresh_ids() {
        let store = store_with_timeout(SESSION_TIMEOUT);

        let (first, reply) = store.open("cat", "I saw a cat.", "Turkish", "English").await;
        let (second, _) = store.open("cat", "I saw a cat.", "Turkish", "English").await;

        assert_ne!(first, second);
        assert_eq!(reply, "feedback");
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_resume_unknown_session() {
        let store = store_with_timeout(SESSION_TIMEOUT);

        let result = store.resume("no-such-session", "hello").await;
        assert!(matches!(result, Err(ChatError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_resume_appends_one_pair() {
        let store = store_with_timeout(SESSION_TIMEOUT);
        let (id, _) = store.open("cat", "I saw a cat.", "Turkish", "English").await;
        assert_eq!(history_len(&store, &id).await, 2);

        let reply = store.resume(&id, "what about plurals?").await.unwrap();
        assert_eq!(reply, "feedback");
        assert_eq!(history_len(&store, &id).await, 4);
    }

    #[tokio::test]
    async fn test_lifecycle_refresh_and_expiry() {
        let store = store_with_timeout(Duration::from_millis(200));
        let (id, _) = store.open("cat", "I saw a cat.", "Turkish", "English").await;

        // Refresh keeps the session alive past its original deadline.
        tokio::time::sleep(Duration::from_millis(120)).await;
        store.resume(&id, "still there?").await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(store.reap_expired().await, 0);
        store.resume(&id, "good").await.unwrap();

        // Idle past the timeout, the reaper removes it and resume reports
        // not-found instead of failing hard.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.reap_expired().await, 1);
        assert!(matches!(
            store.resume(&id, "anyone?").await,
            Err(ChatError::SessionNotFound(_))
        ));
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_resume_keeps_history_consistent() {
        let store = store_with_timeout(SESSION_TIMEOUT);
        let (id, _) = store.open("cat", "I saw a cat.", "Turkish", "English").await;

        let (a, b) = tokio::join!(store.resume(&id, "first"), store.resume(&id, "second"));
        a.unwrap();
        b.unwrap();

        // Both pairs appended exactly once, user/model strictly alternating.
        let sessions = store.inner.sessions.read().await;
        let handle = sessions.get(&id).unwrap();
        let conversation = handle.conversation.lock().await;
        let messages = conversation.messages();
        assert_eq!(messages.len(), 6);
        for (index, message) in messages.iter().enumerate() {
            let expected = if index % 2 == 0 { Role::User } else { Role::Model };
            assert_eq!(message.role, expected);
        }
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_reply_text() {
        let store = SessionStore::with_timeout(
            Arc::new(MockBackend::failing()),
            SESSION_TIMEOUT,
        );

        let (id, reply) = store.open("cat", "I saw a cat.", "Turkish", "English").await;
        assert!(reply.contains("Error providing sentence response"));

        // The session exists and stays usable.
        let reply = store.resume(&id, "retry?").await.unwrap();
        assert!(reply.contains("Error occurred while continuing the chat"));
    }

    #[tokio::test]
    async fn test_reaper_task_removes_idle_sessions() {
        let store = store_with_timeout(Duration::from_millis(100));
        let (_id, _) = store.open("cat", "I saw a cat.", "Turkish", "English").await;

        let reaper = store.clone().spawn_reaper(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(store.session_count().await, 0);
        reaper.abort();
    }
}
