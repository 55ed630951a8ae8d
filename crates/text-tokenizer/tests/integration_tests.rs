//! Integration tests for the tokenizer-backed counter.

use dialog_core::TokenCounter;
use text_tokenizer::{HeuristicCounter, Tokenizer, counter_from_path};

/// A word-level tokenizer: one token per word or punctuation run.
const WORD_LEVEL_JSON: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": null,
  "pre_tokenizer": { "type": "Whitespace" },
  "post_processor": null,
  "decoder": null,
  "model": {
    "type": "WordLevel",
    "vocab": { "[UNK]": 0, "hello": 1, "world": 2, ".": 3 },
    "unk_token": "[UNK]"
  }
}"#;

fn tokenizer() -> Tokenizer {
    Tokenizer::from_json(WORD_LEVEL_JSON).expect("should load tokenizer")
}

#[test]
fn test_count_words() {
    let tokenizer = tokenizer();
    assert_eq!(tokenizer.count("hello world"), 2);
    assert_eq!(tokenizer.count("hello world."), 3);
    assert_eq!(tokenizer.name(), "tokenizer");
}

#[test]
fn test_unknown_words_still_counted() {
    let tokenizer = tokenizer();
    assert_eq!(tokenizer.count("Привіт, світе"), 3);
    assert_eq!(tokenizer.encode_ids("Привіт"), Some(vec![0]));
}

#[test]
fn test_empty_input() {
    assert_eq!(tokenizer().count(""), 0);
}

#[test]
fn test_vocab_size() {
    assert_eq!(tokenizer().vocab_size(), 4);
}

#[test]
fn test_heuristic_never_undercounts_word_level() {
    let exact = tokenizer();
    let heuristic = HeuristicCounter::default();

    for text in [
        "hello",
        "hello world. hello world.",
        "Як справи? Добре, дякую.",
        "a b c d e f g h i j k l m n o p",
        ". . . , , , ! ! !",
    ] {
        assert!(
            heuristic.count(text) >= exact.count(text),
            "heuristic under-counts {text:?}"
        );
    }
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokenizer.json");
    std::fs::write(&path, WORD_LEVEL_JSON).unwrap();

    let tokenizer = Tokenizer::from_file(&path).expect("should load tokenizer");
    assert_eq!(tokenizer.count("world"), 1);

    let counter = counter_from_path(Some(&path));
    assert_eq!(counter.name(), "tokenizer");
    assert_eq!(counter.count("hello hello"), 2);
}
