//! # text-normalizer
//!
//! Text canonicalization for dialogue scripts.
//!
//! This crate provides a rules-based normalizer that:
//! - Applies Unicode NFKC normalization and strips byte-order marks
//! - Unifies apostrophe and dash variants to ASCII
//! - Removes invisible format/control characters (keeping `\n`, `\r`, `\t`)
//! - Turns non-breaking spaces into spaces
//! - Removes whitespace around line breaks
//!
//! The stress marker `+` is never altered or removed.
//!
//! # Example
//!
//! ```ignore
//! use text_normalizer::Normalizer;
//! use dialog_core::TextNormalizer;
//!
//! let normalizer = Normalizer::new();
//! let result = normalizer.normalize("пам\u{2019}ять \u{2014} до+брий");
//! assert_eq!(result.as_str(), "пам'ять - до+брий");
//! ```

mod rules;

use dialog_core::{NormalizedText, TextNormalizer};
use tracing::instrument;

pub use rules::{Rule, STRESS_MARKER};

/// Text normalizer with configurable rule pipeline.
#[derive(Debug)]
pub struct Normalizer {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Create a new normalizer with default rules.
    pub fn new() -> Self {
        Self {
            rules: rules::default_rules(),
        }
    }

    /// Create a normalizer with custom rules.
    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Add a rule to the pipeline.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Names of the rules, in application order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl TextNormalizer for Normalizer {
    #[instrument(skip(self, input), fields(input_len = input.len()))]
    fn normalize(&self, input: &str) -> NormalizedText {
        let text = self
            .rules
            .iter()
            .fold(input.to_string(), |text, rule| rule.apply(&text));

        NormalizedText::new(text)
    }
}

/// Normalize with the default rule set.
pub fn normalize(input: &str) -> NormalizedText {
    Normalizer::new().normalize(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizer_creation() {
        let normalizer = Normalizer::new();
        assert_eq!(
            normalizer.rule_names(),
            vec![
                "byte_order_mark",
                "invisible_chars",
                "unicode_normalization",
                "punctuation",
                "non_breaking_space",
                "newline_whitespace",
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize("").is_empty());
    }

    #[test]
    fn test_basic_normalization() {
        let result = normalize("\u{FEFF}Він сказав \u{2014} пам\u{2019}ятай!  \n  Так.");
        assert_eq!(result.as_str(), "Він сказав - пам'ятай!\nТак.");
    }

    #[test]
    fn test_stress_marker_untouched() {
        let input = "за+мок і замо+к, +a, a+, ++";
        let result = normalize(input);
        assert_eq!(result.as_str(), input);
    }

    #[test]
    fn test_idempotent() {
        let once = normalize("a\u{00A0}b \u{2013} c\u{200D}\n\n  d");
        let twice = normalize(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_combining_marks_compose_across_stripped_chars() {
        let once = normalize("мо\u{200B}\u{0301}ва e\u{FEFF}\u{0301}");
        assert_eq!(once.as_str(), "мо\u{0301}ва \u{00E9}");
        assert_eq!(normalize(once.as_str()), once);
    }

    #[test]
    fn test_custom_rules() {
        #[derive(Debug)]
        struct Upper;
        impl Rule for Upper {
            fn name(&self) -> &str {
                "upper"
            }
            fn apply(&self, input: &str) -> String {
                input.to_uppercase()
            }
        }

        let mut normalizer = Normalizer::with_rules(Vec::new());
        normalizer.add_rule(Box::new(Upper));
        assert_eq!(normalizer.normalize("abc").as_str(), "ABC");
    }
}
