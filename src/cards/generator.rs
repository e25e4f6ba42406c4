//! Card generation
//!
//! Turns a single (word, context) pair into a [`Card`] via the generation
//! backend. The backend is asked for pure JSON; replies are decoded in two
//! independently testable stages, and any failure produces a degraded card
//! instead of an error.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use super::types::Card;
use crate::gemini::{BackendError, GenerationBackend, Message};

/// Error while generating one card. Never escapes [`CardGenerator::generate`].
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Error generating card: {0}")]
    Backend(#[from] BackendError),

    #[error("Error parsing card response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Card fields as requested from the backend.
///
/// Every field is optional: the decode stage tolerates partial replies and
/// the assembly stage fills in what it can.
#[derive(Debug, Deserialize)]
struct CardReply {
    word: Option<String>,
    t_word: Option<String>,
    synonyms: Option<String>,
    description: Option<String>,
    sentence: Option<String>,
    t_sentence: Option<String>,
    pronunciation: Option<String>,
    part_of_speech: Option<String>,
}

/// Generates cards one (word, context) pair at a time.
///
/// Each invocation is independent: no conversation state, no memory of
/// prior cards for the same word.
pub struct CardGenerator {
    backend: Arc<dyn GenerationBackend>,
}

impl CardGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Generate a card for one word, optionally in a context sentence.
    ///
    /// Never fails: backend and decode errors are downgraded to a card
    /// carrying the error text, so batch orchestration can treat every item
    /// uniformly.
    pub async fn generate(
        &self,
        word: &str,
        n_language: &str,
        l_language: &str,
        sentence: Option<&str>,
    ) -> Card {
        match self
            .try_generate(word, n_language, l_language, sentence)
            .await
        {
            Ok(card) => card,
            Err(e) => {
                tracing::warn!(word = %word, error = %e, "Card generation failed, returning degraded card");
                Card::degraded(word, &e.to_string())
            }
        }
    }

    async fn try_generate(
        &self,
        word: &str,
        n_language: &str,
        l_language: &str,
        sentence: Option<&str>,
    ) -> Result<Card, GenerateError> {
        let prompt = card_prompt(word, n_language, l_language, sentence);
        let reply = self.backend.generate(&[Message::user(prompt)]).await?;
        let fields = decode_card_reply(&reply)?;
        Ok(assemble_card(word, fields))
    }
}

fn card_prompt(word: &str, n_language: &str, l_language: &str, sentence: Option<&str>) -> String {
    let context = sentence
        .map(|s| format!("in the context: {s}. "))
        .unwrap_or_default();

    format!(
        "Create a language card for the word '{word}', user native language is '{n_language}' \
         and learning '{l_language}'. \
         {context}Correct the misspelled parts in the sentence and create the card based on it.\n\n\
         Return a JSON response with these fields:\n\
         - word (original word)\n\
         - t_word (translation of the word)\n\
         - synonyms (original synonyms, comma separated)\n\
         - description (Explain in the user's native language. Show the general meaning of the \
         given word and the meaning it creates in the sentence.)\n\
         - sentence (Sentence provided by user. If a long fragment appears, return only the \
         sentence containing the word.)\n\
         - t_sentence (translated sentence in the user's native language)\n\
         - pronunciation (phonetic pronunciation)\n\
         - part_of_speech (word is it a noun, verb, etc.)\n\n\
         Response must be valid JSON format. Only return the JSON object, no extra text or markdown."
    )
}

/// Strip a wrapping markdown code fence, if present.
///
/// The backend is told not to fence its reply, but does anyway often enough
/// that fenced and unfenced replies must decode identically.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    for fence in ["```json", "```"] {
        if let Some(rest) = trimmed.strip_prefix(fence) {
            if let Some(inner) = rest.strip_suffix("```") {
                return inner.trim();
            }
        }
    }
    trimmed
}

fn decode_card_reply(raw: &str) -> Result<CardReply, serde_json::Error> {
    serde_json::from_str(strip_code_fence(raw))
}

fn assemble_card(word: &str, fields: CardReply) -> Card {
    Card {
        card_id: None,
        word: fields.word.unwrap_or_else(|| word.to_string()),
        t_word: fields.t_word,
        description: fields.description,
        pronunciation: fields.pronunciation,
        part_of_speech: fields.part_of_speech,
        synonyms: fields.synonyms,
        sentence: fields.sentence,
        t_sentence: fields.t_sentence,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::MockBackend;

    const CARD_JSON: &str = r#"{
        "word": "cat",
        "t_word": "kedi",
        "synonyms": "feline, kitty",
        "description": "Evcil bir hayvan.",
        "sentence": "I saw a cat.",
        "t_sentence": "Bir kedi gördüm.",
        "pronunciation": "kæt",
        "part_of_speech": "noun"
    }"#;

    #[test]
    fn test_strip_code_fence_variants() {
        let plain = r#"{"word": "cat"}"#;
        let fenced = format!("```json\n{plain}\n```");
        let bare_fence = format!("```\n{plain}\n```");

        assert_eq!(strip_code_fence(plain), plain);
        assert_eq!(strip_code_fence(&fenced), plain);
        assert_eq!(strip_code_fence(&bare_fence), plain);
    }

    #[test]
    fn test_decode_tolerates_partial_reply() {
        let fields = decode_card_reply(r#"{"t_word": "kedi"}"#).unwrap();
        assert_eq!(fields.t_word.as_deref(), Some("kedi"));
        assert!(fields.description.is_none());

        let card = assemble_card("cat", fields);
        assert_eq!(card.word, "cat");
        assert_eq!(card.t_word.as_deref(), Some("kedi"));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(decode_card_reply("Sorry, I cannot help with that.").is_err());
    }

    #[tokio::test]
    async fn test_generate_parses_fenced_reply() {
        let reply = format!("```json\n{CARD_JSON}\n```");
        let generator = CardGenerator::new(Arc::new(MockBackend::replying(reply)));

        let card = generator
            .generate("cat", "Turkish", "English", Some("I saw a cat."))
            .await;

        assert_eq!(card.word, "cat");
        assert_eq!(card.t_word.as_deref(), Some("kedi"));
        assert_eq!(card.part_of_speech.as_deref(), Some("noun"));
        assert!(!card.is_degraded());
    }

    #[tokio::test]
    async fn test_non_json_reply_degrades() {
        let generator =
            CardGenerator::new(Arc::new(MockBackend::replying("not json at all")));

        let card = generator.generate("cat", "Turkish", "English", None).await;

        assert_eq!(card.word, "cat");
        assert!(card.is_degraded());
        assert!(card.description.is_some());
    }

    #[tokio::test]
    async fn test_backend_failure_degrades() {
        let generator = CardGenerator::new(Arc::new(MockBackend::failing()));

        let card = generator.generate("cat", "Turkish", "English", None).await;

        assert_eq!(card.word, "cat");
        assert!(card.is_degraded());
        assert!(card.description.unwrap().contains("mock backend failure"));
    }

    #[test]
    fn test_prompt_includes_context_only_when_present() {
        let with = card_prompt("cat", "Turkish", "English", Some("I saw a cat."));
        let without = card_prompt("cat", "Turkish", "English", None);

        assert!(with.contains("in the context: I saw a cat."));
        assert!(!without.contains("in the context"));
        assert!(without.contains("'cat'"));
    }
}
