//! Application state management

use std::sync::Arc;

use crate::cards::{CardGenerator, CardService};
use crate::chat::SessionStore;
use crate::config::Config;
use crate::extract::TextExtractor;
use crate::gemini::GenerationBackend;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    cards: CardService,
    sessions: SessionStore,
}

impl AppState {
    /// Create application state around a generation backend and a text
    /// extractor. Both are injected so tests can substitute doubles.
    pub fn new(
        config: Config,
        backend: Arc<dyn GenerationBackend>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let generator = CardGenerator::new(backend.clone());
        let cards = CardService::new(generator, extractor);
        let sessions = SessionStore::new(backend);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                cards,
                sessions,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the card service
    pub fn cards(&self) -> &CardService {
        &self.inner.cards
    }

    /// Get the session store
    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }
}
