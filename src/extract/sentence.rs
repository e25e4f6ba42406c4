//! Sentence extraction
//!
//! Finds the sentences of a raw text that contain a target word. The text
//! usually comes from OCR, so line breaks appear mid-sentence and stray `~`
//! characters act as soft sentence terminators.

use regex::RegexBuilder;

/// Find every sentence in `text` containing `word` as a whole word.
///
/// Matching is case-insensitive and boundary-aware: "cat" does not match
/// inside "catalog". Returns `None` when no sentence matches, so callers can
/// distinguish "nothing found" from an empty result and fall back to a
/// context-less card.
pub fn find_sentences(text: &str, word: &str) -> Option<Vec<String>> {
    // OCR output routinely breaks sentences across lines.
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

    // Shortest span with no terminator before the word, extended to the
    // next terminator after it.
    let pattern = format!(r"[^.!?~]*?\b{}\b[^.!?~]*[.!?~]", regex::escape(word));
    let finder = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .expect("escaped word always yields a valid pattern");

    let sentences: Vec<String> = finder
        .find_iter(&normalized)
        .map(|m| {
            m.as_str()
                .trim_matches(|c: char| {
                    matches!(c, '.' | '!' | '?' | '~') || c.is_whitespace()
                })
                .to_string()
        })
        .filter(|sentence| !sentence.is_empty())
        .collect();

    if sentences.is_empty() {
        None
    } else {
        Some(sentences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_boundary() {
        assert_eq!(find_sentences("The catalog is big.", "cat"), None);
    }

    #[test]
    fn test_multi_sentence_extraction() {
        let found = find_sentences("I saw a cat. The cat ran away.", "cat").unwrap();
        assert_eq!(found, vec!["I saw a cat", "The cat ran away"]);
    }

    #[test]
    fn test_no_match_returns_none() {
        assert_eq!(find_sentences("Hello world.", "zebra"), None);
    }

    #[test]
    fn test_idempotent() {
        let text = "A dog barked. The dog slept! Another dog?";
        let first = find_sentences(text, "dog");
        let second = find_sentences(text, "dog");
        assert_eq!(first, second);
        assert_eq!(first.unwrap().len(), 3);
    }

    #[test]
    fn test_case_insensitive() {
        let found = find_sentences("The CAT sat on the mat.", "cat").unwrap();
        assert_eq!(found, vec!["The CAT sat on the mat"]);
    }

    #[test]
    fn test_word_repeated_in_one_sentence_matches_once() {
        let found = find_sentences("The cat saw another cat.", "cat").unwrap();
        assert_eq!(found, vec!["The cat saw another cat"]);
    }

    #[test]
    fn test_word_at_text_start() {
        let found = find_sentences("Cat ran away. Dogs slept.", "cat").unwrap();
        assert_eq!(found, vec!["Cat ran away"]);
    }

    #[test]
    fn test_collapses_ocr_line_breaks() {
        let found = find_sentences("I saw\na  cat\nnear home. More text.", "cat").unwrap();
        assert_eq!(found, vec!["I saw a cat near home"]);
    }

    #[test]
    fn test_soft_terminator_from_ocr_noise() {
        let found = find_sentences("garbled~ the cat sat there~ more noise", "cat").unwrap();
        assert_eq!(found, vec!["the cat sat there"]);
    }
}
