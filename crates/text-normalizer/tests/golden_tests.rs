//! Golden tests for text normalization.
//!
//! These tests verify that the normalizer produces expected output for a corpus
//! of representative script inputs.

use dialog_core::TextNormalizer;
use proptest::prelude::*;
use text_normalizer::{Normalizer, STRESS_MARKER};
use unicode_normalization::is_nfkc;

/// Test case structure for golden tests.
struct GoldenTestCase {
    input: &'static str,
    expected: &'static str,
    description: &'static str,
}

const GOLDEN_TESTS: &[GoldenTestCase] = &[
    GoldenTestCase {
        input: "#g1: Привіт.",
        expected: "#g1: Привіт.",
        description: "Already canonical script line",
    },
    GoldenTestCase {
        input: "#g2_fast: Ти\u{2019}сь зна\u{02BC}єш?",
        expected: "#g2_fast: Ти'сь зна'єш?",
        description: "Apostrophe variants",
    },
    GoldenTestCase {
        input: "Рік 1990\u{2013}2000 \u{2014} мінус \u{2212}5",
        expected: "Рік 1990-2000 - мінус -5",
        description: "Dash variants",
    },
    GoldenTestCase {
        input: "\u{FEFF}Перший рядок",
        expected: "Перший рядок",
        description: "Leading byte-order mark",
    },
    GoldenTestCase {
        input: "сло\u{00AD}во з\u{200B}прихованими\u{2060}символами",
        expected: "слово зприхованимисимволами",
        description: "Soft hyphen, zero-width space and word joiner",
    },
    GoldenTestCase {
        input: "10\u{00A0}000 гривень",
        expected: "10 000 гривень",
        description: "Non-breaking space",
    },
    GoldenTestCase {
        input: "Перший абзац.   \n\n\t Другий абзац.",
        expected: "Перший абзац.\n\nДругий абзац.",
        description: "Whitespace around newlines, blank line kept",
    },
    GoldenTestCase {
        input: "Вона сказала: \u{2026}за+раз",
        expected: "Вона сказала: ...за+раз",
        description: "Ellipsis expands under NFKC, stress marker kept",
    },
    GoldenTestCase {
        input: "ＦＵＬＬ　ｗｉｄｔｈ",
        expected: "FULL width",
        description: "Full-width forms",
    },
    GoldenTestCase {
        input: "caf\u{200B}e\u{FEFF}\u{0301} i\u{00AD}\u{0308}",
        expected: "caf\u{00E9} \u{00EF}",
        description: "Combining marks compose once invisible characters are gone",
    },
];

#[test]
fn golden_corpus() {
    let normalizer = Normalizer::new();
    let mut failures = Vec::new();

    for case in GOLDEN_TESTS {
        let result = normalizer.normalize(case.input);
        if result.as_str() != case.expected {
            failures.push(format!(
                "{}: expected {:?}, got {:?}",
                case.description,
                case.expected,
                result.as_str()
            ));
        }
    }

    assert!(failures.is_empty(), "golden failures:\n{}", failures.join("\n"));
}

proptest! {
    #[test]
    fn stress_markers_survive(input in "[a-zа-я +\\n\\t\u{00A0}\u{200B}\u{2019}\u{2014}]{0,200}") {
        let normalized = Normalizer::new().normalize(&input);
        let before = input.chars().filter(|&c| c == STRESS_MARKER).count();
        let after = normalized.as_str().chars().filter(|&c| c == STRESS_MARKER).count();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn only_allowed_controls_remain(input in "\\PC{0,100}[\u{0000}-\u{001F}\u{200B}-\u{200F}]{0,10}") {
        let normalized = Normalizer::new().normalize(&input);
        for c in normalized.as_str().chars() {
            prop_assert!(!c.is_control() || matches!(c, '\n' | '\r' | '\t'), "control {:?} left", c);
        }
    }

    #[test]
    fn normalization_is_idempotent(input in "\\PC{0,200}") {
        let normalizer = Normalizer::new();
        let once = normalizer.normalize(&input);
        let twice = normalizer.normalize(once.as_str());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn output_is_nfkc_with_invisibles_between_marks(
        input in "[aeiouаеіо \n\u{200B}\u{2060}\u{FEFF}\u{00AD}\u{0301}\u{0308}\u{0306}]{0,100}"
    ) {
        let normalizer = Normalizer::new();
        let once = normalizer.normalize(&input);
        prop_assert!(is_nfkc(once.as_str()), "not NFKC: {:?}", once.as_str());
        let twice = normalizer.normalize(once.as_str());
        prop_assert_eq!(once, twice);
    }
}
