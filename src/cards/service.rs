//! Card creation orchestration
//!
//! Composes OCR, sentence extraction and card generation to turn a batch of
//! words plus a context source into cards. Failures are isolated per item:
//! one bad pair never aborts the batch.

use std::sync::Arc;

use futures::future::join_all;

use super::generator::CardGenerator;
use super::types::{Card, CardError, MAX_IMAGE_BYTES, MAX_TEXT_CHARS};
use crate::extract::{find_sentences, TextExtractor};

pub struct CardService {
    generator: CardGenerator,
    extractor: Arc<dyn TextExtractor>,
}

impl CardService {
    pub fn new(generator: CardGenerator, extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            generator,
            extractor,
        }
    }

    /// Create cards from a photographed page.
    ///
    /// The size bound is checked before any decoding work.
    pub async fn create_cards_from_image(
        &self,
        image: &[u8],
        words: &[String],
        n_language: &str,
        l_language: &str,
    ) -> Result<Vec<Card>, CardError> {
        if image.is_empty() {
            return Err(CardError::EmptyImage);
        }
        if image.len() > MAX_IMAGE_BYTES {
            return Err(CardError::ImageTooLarge {
                size: image.len(),
                max: MAX_IMAGE_BYTES,
            });
        }

        let decoded = image::load_from_memory(image).map_err(|e| {
            tracing::warn!(error = %e, "Rejected undecodable image");
            CardError::InvalidImage
        })?;

        let text = self
            .extractor
            .extract(&decoded)
            .await
            .map_err(|e| CardError::Extraction(e.to_string()))?;
        tracing::debug!(chars = text.len(), "Extracted text from image");

        Ok(self
            .generate_batch(&text, words, n_language, l_language)
            .await)
    }

    /// Create cards from typed text.
    pub async fn create_cards_from_text(
        &self,
        text: &str,
        words: &[String],
        n_language: &str,
        l_language: &str,
    ) -> Result<Vec<Card>, CardError> {
        if text.trim().is_empty() {
            return Err(CardError::EmptyText);
        }
        let len = text.chars().count();
        if len > MAX_TEXT_CHARS {
            return Err(CardError::TextTooLong {
                len,
                max: MAX_TEXT_CHARS,
            });
        }
        if words.is_empty() {
            return Err(CardError::NoWords);
        }

        Ok(self
            .generate_batch(text, words, n_language, l_language)
            .await)
    }

    /// Fan out generation for every (word, sentence) pair.
    ///
    /// Pairs are planned up front so results come back in word order, then
    /// sentence order, regardless of how the concurrent calls interleave.
    /// A word with no matching sentence still gets one context-less attempt.
    async fn generate_batch(
        &self,
        text: &str,
        words: &[String],
        n_language: &str,
        l_language: &str,
    ) -> Vec<Card> {
        let mut pairs: Vec<(&str, Option<String>)> = Vec::new();
        for word in words {
            match find_sentences(text, word) {
                Some(sentences) => {
                    pairs.extend(sentences.into_iter().map(|s| (word.as_str(), Some(s))))
                }
                None => pairs.push((word.as_str(), None)),
            }
        }

        tracing::debug!(
            words = words.len(),
            pairs = pairs.len(),
            "Planned card generation batch"
        );

        join_all(pairs.iter().map(|(word, sentence)| {
            self.generator
                .generate(word, n_language, l_language, sentence.as_deref())
        }))
        .await
    }
}
