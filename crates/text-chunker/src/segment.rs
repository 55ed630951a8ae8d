//! Paragraph, sentence and word segmentation.

use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"));

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?…]\s+").expect("sentence pattern is valid"));

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+\s*").expect("word pattern is valid"));

/// Non-empty paragraphs, trimmed.
pub fn paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Sentences of a paragraph. The terminating punctuation stays with its
/// sentence; the whitespace after it is dropped.
pub fn sentences(paragraph: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(paragraph) {
        let punct_len = m.as_str().chars().next().map_or(0, char::len_utf8);
        let sentence = paragraph[start..m.start() + punct_len].trim();
        if !sentence.is_empty() {
            out.push(sentence);
        }
        start = m.end();
    }

    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Words with their trailing whitespace.
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    WORD.find_iter(text).map(|m| m.as_str())
}

/// Byte offset of the `n`th character, or the string length.
pub fn char_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}

/// Split point for an over-long chunk: just after the `,` `;` or `:`
/// (followed by whitespace) closest to the middle, else the middle
/// character. Returns the byte offsets `(left_end, right_start)`.
pub fn midpoint_split(text: &str) -> (usize, usize) {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mid = chars.len() / 2;

    let best = chars
        .windows(2)
        .enumerate()
        .filter(|(_, w)| matches!(w[0].1, ',' | ';' | ':') && w[1].1.is_whitespace())
        .map(|(i, w)| (i.abs_diff(mid), w[0].0 + w[0].1.len_utf8()))
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, end)| end);

    match best {
        Some(end) if end < text.len() => {
            let rest = &text[end..];
            let start = end + (rest.len() - rest.trim_start().len());
            (end, start)
        }
        _ => {
            let at = char_offset(text, mid.max(1));
            (at, at)
        }
    }
}
