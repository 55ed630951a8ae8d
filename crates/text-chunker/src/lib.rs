//! # text-chunker
//!
//! Splits normalized text into pieces the synthesis encoder accepts.
//!
//! Every chunk satisfies two limits: a token budget (measured by a pluggable
//! [`TokenCounter`]) and a character cap. Splitting prefers, in order:
//! - paragraph boundaries (blank lines)
//! - sentence boundaries (`.` `!` `?` `…` followed by whitespace)
//! - word boundaries, for sentences that are too long on their own
//! - hard character cuts, for single "words" that are still too long
//!
//! A final pass re-validates every chunk and re-splits offenders at the
//! clause punctuation closest to their midpoint.
//!
//! # Example
//!
//! ```ignore
//! use text_chunker::{Chunker, HARD_MAX_TOKENS};
//!
//! let chunker = Chunker::default();
//! let chunks = chunker.split_str("Перше речення. Друге речення.", HARD_MAX_TOKENS);
//! ```

pub mod segment;

use std::fmt;

use dialog_core::{Chunk, NormalizedText, TextNormalizer, TokenCounter};
use text_normalizer::Normalizer;
use text_tokenizer::HeuristicCounter;
use tracing::{debug, instrument, warn};

/// Default token budget per chunk.
pub const HARD_MAX_TOKENS: usize = 280;

/// Maximum characters per chunk regardless of token count.
pub const CHAR_CAP: usize = 1200;

/// The encoder's true input limit.
pub const ENCODER_MAX_TOKENS: usize = 512;

/// Budget ceiling used wherever chunk sizing is decided.
pub const TOKEN_SAFETY: usize = 480;

/// Content tokens a chunk can always hold on top of the counter's fixed
/// overhead.
pub const MIN_CONTENT_TOKENS: usize = 16;

/// Token-budget-aware text splitter.
///
/// Owns its token counter; construct one per pipeline and share it by
/// reference.
pub struct Chunker {
    counter: Box<dyn TokenCounter>,
    normalizer: Normalizer,
}

impl fmt::Debug for Chunker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunker")
            .field("counter", &self.counter.name())
            .finish()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(Box::new(HeuristicCounter::default()))
    }
}

impl Chunker {
    /// Create a chunker with the given token counter.
    pub fn new(counter: Box<dyn TokenCounter>) -> Self {
        Self {
            counter,
            normalizer: Normalizer::new(),
        }
    }

    /// Name of the token counter in use.
    pub fn counter_name(&self) -> &str {
        self.counter.name()
    }

    /// Token count of `text` as the encoder would see it.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Whether `text` satisfies both the token budget and the character cap.
    pub fn fits(&self, text: &str, max_tokens: usize) -> bool {
        text.chars().count() <= CHAR_CAP && self.counter.count(text) <= max_tokens
    }

    /// Smallest budget this chunker honours: the counter's overhead for
    /// empty input plus [`MIN_CONTENT_TOKENS`].
    pub fn min_budget(&self) -> usize {
        (self.counter.count("") + MIN_CONTENT_TOKENS).min(TOKEN_SAFETY)
    }

    /// The budget `split` actually applies for a requested `max_tokens`.
    pub fn effective_budget(&self, max_tokens: usize) -> usize {
        max_tokens.clamp(self.min_budget(), TOKEN_SAFETY)
    }

    /// Normalize raw text, then split it.
    pub fn split_str(&self, text: &str, max_tokens: usize) -> Vec<Chunk> {
        let normalized = self.normalizer.normalize(text);
        self.split(&normalized, max_tokens)
    }

    /// Split normalized text into chunks of at most `max_tokens` tokens
    /// and [`CHAR_CAP`] characters. The budget is clamped to
    /// [`Chunker::min_budget`]..=[`TOKEN_SAFETY`].
    #[instrument(skip(self, text), fields(text_len = text.char_len()))]
    pub fn split(&self, text: &NormalizedText, max_tokens: usize) -> Vec<Chunk> {
        let budget = self.effective_budget(max_tokens);
        if budget > max_tokens {
            warn!(
                requested = max_tokens,
                budget,
                counter = self.counter.name(),
                "Token budget below counter overhead, raised"
            );
        }
        let mut pieces = Vec::new();

        for paragraph in segment::paragraphs(text.as_str()) {
            self.split_paragraph(paragraph, budget, &mut pieces);
        }

        let mut chunks = Vec::with_capacity(pieces.len());
        for piece in pieces {
            self.revalidate(piece, budget, &mut chunks);
        }

        debug!(
            chunks = chunks.len(),
            counter = self.counter.name(),
            "Text split"
        );
        chunks
    }

    fn split_paragraph(&self, paragraph: &str, budget: usize, out: &mut Vec<String>) {
        let mut buffer = String::new();

        for sentence in segment::sentences(paragraph) {
            if !self.fits(sentence, budget) {
                flush(&mut buffer, out);
                debug!(
                    chars = sentence.chars().count(),
                    "Sentence over budget, splitting by words"
                );
                self.split_words(sentence, budget, out);
                continue;
            }

            if buffer.is_empty() {
                buffer.push_str(sentence);
                continue;
            }

            let candidate = format!("{buffer} {sentence}");
            if self.fits(&candidate, budget) {
                buffer = candidate;
            } else {
                flush(&mut buffer, out);
                buffer.push_str(sentence);
            }
        }

        flush(&mut buffer, out);
    }

    fn split_words(&self, sentence: &str, budget: usize, out: &mut Vec<String>) {
        let mut buffer = String::new();

        for word in segment::words(sentence) {
            let candidate = format!("{buffer}{word}");
            if self.fits(candidate.trim_end(), budget) {
                buffer = candidate;
                continue;
            }

            flush(&mut buffer, out);
            if self.fits(word.trim_end(), budget) {
                buffer.push_str(word);
            } else {
                debug!(
                    chars = word.chars().count(),
                    "Word over budget, cutting by characters"
                );
                self.hard_cut(word.trim_end(), budget, out);
            }
        }

        flush(&mut buffer, out);
    }

    /// Cut a run of text with no usable boundary. Each piece takes 70% of
    /// what is left, shrinking by 70% again until it fits. A single
    /// character is always emitted so the loop terminates.
    fn hard_cut(&self, text: &str, budget: usize, out: &mut Vec<String>) {
        let mut rest = text;

        while !rest.is_empty() {
            if self.fits(rest, budget) {
                out.push(rest.to_string());
                return;
            }

            let mut take = (rest.chars().count() * 7 / 10).max(1);
            let mut end = segment::char_offset(rest, take);
            while take > 1 && !self.fits(&rest[..end], budget) {
                take = (take * 7 / 10).max(1);
                end = segment::char_offset(rest, take);
            }

            out.push(rest[..end].to_string());
            rest = &rest[end..];
        }
    }

    fn revalidate(&self, piece: String, budget: usize, out: &mut Vec<Chunk>) {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            return;
        }

        if self.fits(trimmed, budget) || trimmed.chars().count() <= 1 {
            out.push(Chunk::new(trimmed));
            return;
        }

        let (left_end, right_start) = segment::midpoint_split(trimmed);
        debug!(
            chars = trimmed.chars().count(),
            "Chunk failed validation, re-splitting at midpoint"
        );
        self.revalidate(trimmed[..left_end].to_string(), budget, out);
        self.revalidate(trimmed[right_start..].to_string(), budget, out);
    }
}

fn flush(buffer: &mut String, out: &mut Vec<String>) {
    let piece = buffer.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
    buffer.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use text_tokenizer::DEFAULT_HEURISTIC_MARGIN;

    fn char_chunker() -> Chunker {
        Chunker::new(Box::new(HeuristicCounter::new(0)))
    }

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(Chunk::as_str).collect()
    }

    #[test]
    fn test_constants() {
        assert!(TOKEN_SAFETY < ENCODER_MAX_TOKENS);
        assert!(HARD_MAX_TOKENS < TOKEN_SAFETY);
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = Chunker::default().split_str("Привіт. Як справи?", HARD_MAX_TOKENS);
        assert_eq!(texts(&chunks), vec!["Привіт. Як справи?"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(Chunker::default().split_str("", HARD_MAX_TOKENS).is_empty());
        assert!(Chunker::default().split_str(" \n\n \n", HARD_MAX_TOKENS).is_empty());
    }

    #[test]
    fn test_paragraphs_are_never_merged() {
        let chunks = char_chunker().split_str("Один.\n\nДва.", 100);
        assert_eq!(texts(&chunks), vec!["Один.", "Два."]);
    }

    #[test]
    fn test_sentences_accumulate_until_budget() {
        // 10 chars each, joined with one space
        let text = "Aaaaaaaaa. Bbbbbbbbb. Ccccccccc. Ddddddddd.";
        let chunks = char_chunker().split_str(text, 21);
        assert_eq!(
            texts(&chunks),
            vec!["Aaaaaaaaa. Bbbbbbbbb.", "Ccccccccc. Ddddddddd."]
        );
    }

    #[test]
    fn test_long_sentence_splits_on_words() {
        let text = "один два три чотири п'ять шість сім вісім";
        let chunks = char_chunker().split_str(text, 15);

        for chunk in &chunks {
            assert!(chunk.char_len() <= 15, "{chunk:?}");
        }
        assert_eq!(texts(&chunks).join(" "), text);
    }

    #[test]
    fn test_run_on_word_is_hard_cut() {
        let text = "x".repeat(100);
        let chunks = char_chunker().split_str(&text, 30);

        assert!(chunks.len() >= 4);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 30);
        }
        assert_eq!(texts(&chunks).concat(), text);
    }

    #[test]
    fn test_char_cap_applies_with_generous_budget() {
        let text = "слово ".repeat(400);
        let chunks = Chunker::new(Box::new(HeuristicCounter::new(0))).split_str(&text, TOKEN_SAFETY);
        for chunk in &chunks {
            assert!(chunk.char_len() <= CHAR_CAP);
        }
    }

    #[test]
    fn test_budget_is_capped_at_token_safety() {
        let text = "я ".repeat(600);
        let chunks = char_chunker().split_str(&text, 10_000);
        for chunk in &chunks {
            assert!(chunk.char_len() <= TOKEN_SAFETY);
        }
    }

    #[test]
    fn test_heuristic_margin_shrinks_chunks() {
        let text = "a".repeat(300);
        let chunks = Chunker::default().split_str(&text, HARD_MAX_TOKENS);
        let counter = HeuristicCounter::default();
        for chunk in &chunks {
            assert!(counter.count(chunk.as_str()) <= HARD_MAX_TOKENS);
        }
        assert_eq!(texts(&chunks).concat(), text);
    }

    #[test]
    fn test_stress_marker_preserved() {
        let chunks = char_chunker().split_str("за+мок. замо+к. за+мок.", 16);
        assert_eq!(texts(&chunks), vec!["за+мок. замо+к.", "за+мок."]);
    }

    #[test]
    fn test_rechunking_is_idempotent() {
        let chunker = char_chunker();
        let text = "Перше речення тут. Друге, трохи довше речення! А третє? Так.";
        for chunk in chunker.split_str(text, 25) {
            let again = chunker.split_str(chunk.as_str(), 25);
            assert_eq!(texts(&again), vec![chunk.as_str()]);
        }
    }

    #[test]
    fn test_tiny_budget_is_raised_above_counter_overhead() {
        let chunker = Chunker::default();
        assert_eq!(chunker.min_budget(), DEFAULT_HEURISTIC_MARGIN + MIN_CONTENT_TOKENS);
        assert_eq!(chunker.effective_budget(10), chunker.min_budget());
        assert_eq!(chunker.effective_budget(10_000), TOKEN_SAFETY);

        let chunks = chunker.split_str("Привіт світ.", 10);
        assert_eq!(texts(&chunks), vec!["Привіт світ."]);
    }

    #[test]
    fn test_tiny_budget_keeps_words_whole() {
        let text = "один два три чотири п'ять шість сім вісім дев'ять десять";
        let chunks = Chunker::default().split_str(text, 1);

        assert!(chunks.len() < text.split(' ').count());
        for chunk in &chunks {
            assert!(chunk.char_len() > 1, "{chunk:?}");
        }
        assert_eq!(texts(&chunks).join(" "), text);
    }

    #[test]
    fn test_deterministic() {
        let chunker = Chunker::default();
        let text = "Речення. ".repeat(200);
        assert_eq!(chunker.split_str(&text, 120), chunker.split_str(&text, 120));
    }

    #[test]
    fn test_debug_shows_counter() {
        assert!(format!("{:?}", Chunker::default()).contains("heuristic"));
    }
}
