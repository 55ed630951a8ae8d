//! Property tests for chunk limits and content preservation.

use dialog_core::{NormalizedText, TokenCounter};
use proptest::prelude::*;
use text_chunker::{CHAR_CAP, Chunker, HARD_MAX_TOKENS, TOKEN_SAFETY};
use text_tokenizer::HeuristicCounter;

fn non_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[test]
fn paragraph_without_punctuation_splits_and_reassembles() {
    let words = ["слово", "інше", "ще", "довшеслово", "так"];
    let mut paragraph = String::new();
    let mut i = 0;
    while paragraph.chars().count() < 2000 {
        if !paragraph.is_empty() {
            paragraph.push(' ');
        }
        paragraph.push_str(words[i % words.len()]);
        i += 1;
    }

    let chunks = Chunker::default().split(&NormalizedText::new(paragraph.clone()), HARD_MAX_TOKENS);

    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.char_len() <= CHAR_CAP);
    }
    let joined: Vec<&str> = chunks.iter().map(|c| c.as_str()).collect();
    assert_eq!(joined.join(" "), paragraph);
}

#[test]
fn paragraph_without_whitespace_is_cut_losslessly() {
    let paragraph = "ж".repeat(2000);
    let chunks = Chunker::default().split(&NormalizedText::new(paragraph.clone()), HARD_MAX_TOKENS);

    assert!(chunks.len() >= 2);
    let counter = HeuristicCounter::default();
    for chunk in &chunks {
        assert!(chunk.char_len() <= CHAR_CAP);
        assert!(counter.count(chunk.as_str()) <= HARD_MAX_TOKENS);
    }
    let joined: String = chunks.iter().map(|c| c.as_str()).collect();
    assert_eq!(joined, paragraph);
}

fn script_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => "[a-zа-яі+']{1,12}",
            1 => "[a-zа-я]{20,600}",
            1 => Just(". ".to_string()),
            1 => Just("? ".to_string()),
            1 => Just(", ".to_string()),
            1 => Just("\n\n".to_string()),
        ],
        0..120,
    )
    .prop_map(|parts| parts.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn chunks_respect_limits(text in script_text(), max_tokens in 40usize..600) {
        let chunker = Chunker::default();
        let counter = HeuristicCounter::default();
        let budget = chunker.effective_budget(max_tokens);
        prop_assert!(budget <= TOKEN_SAFETY);

        for chunk in chunker.split_str(&text, max_tokens) {
            prop_assert!(chunk.char_len() <= CHAR_CAP);
            prop_assert!(counter.count(chunk.as_str()) <= budget, "{} > {}", counter.count(chunk.as_str()), budget);
        }
    }

    #[test]
    fn chunks_preserve_content_in_order(text in script_text(), max_tokens in 40usize..600) {
        let chunks = Chunker::default().split_str(&text, max_tokens);
        let joined: String = chunks.iter().map(|c| c.as_str()).collect();
        prop_assert_eq!(non_whitespace(&joined), non_whitespace(&text));
    }

    #[test]
    fn chunks_are_never_empty(text in script_text()) {
        for chunk in Chunker::default().split_str(&text, HARD_MAX_TOKENS) {
            prop_assert!(!chunk.as_str().trim().is_empty());
        }
    }

    #[test]
    fn split_is_deterministic(text in script_text(), max_tokens in 40usize..600) {
        let chunker = Chunker::new(Box::new(HeuristicCounter::new(0)));
        prop_assert_eq!(chunker.split_str(&text, max_tokens), chunker.split_str(&text, max_tokens));
    }
}
