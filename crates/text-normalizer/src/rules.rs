//! Normalization rules.

use unicode_normalization::UnicodeNormalization;

/// The stress marker. Synthesis reads it as a phonetic instruction, so no
/// rule may alter or drop it.
pub const STRESS_MARKER: char = '+';

/// A text normalization rule.
pub trait Rule: Send + Sync + std::fmt::Debug {
    /// Get the rule name.
    fn name(&self) -> &str;

    /// Apply the rule to the input text.
    fn apply(&self, input: &str) -> String;
}

/// Create the default set of normalization rules.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(ByteOrderMarkRule),
        Box::new(InvisibleCharRule),
        Box::new(UnicodeNormalizationRule),
        Box::new(PunctuationRule),
        Box::new(NonBreakingSpaceRule),
        Box::new(NewlineWhitespaceRule),
    ]
}

/// Unicode normalization (NFKC form).
#[derive(Debug)]
pub struct UnicodeNormalizationRule;

impl Rule for UnicodeNormalizationRule {
    fn name(&self) -> &str {
        "unicode_normalization"
    }

    fn apply(&self, input: &str) -> String {
        input.nfkc().collect()
    }
}

/// Strip byte-order marks.
#[derive(Debug)]
pub struct ByteOrderMarkRule;

impl Rule for ByteOrderMarkRule {
    fn name(&self) -> &str {
        "byte_order_mark"
    }

    fn apply(&self, input: &str) -> String {
        input.replace('\u{FEFF}', "")
    }
}

/// Unify apostrophe and dash variants to their ASCII forms.
#[derive(Debug)]
pub struct PunctuationRule;

impl Rule for PunctuationRule {
    fn name(&self) -> &str {
        "punctuation"
    }

    fn apply(&self, input: &str) -> String {
        input
            .chars()
            .map(|c| match c {
                // Right single quote, modifier apostrophe, turned comma, prime
                '\u{2019}' | '\u{02BC}' | '\u{02BB}' | '\u{02B9}' => '\'',
                // Em dash, en dash, minus sign
                '\u{2014}' | '\u{2013}' | '\u{2212}' => '-',
                _ => c,
            })
            .collect()
    }
}

/// Remove control (Cc) and format (Cf) code points except `\n`, `\r`, `\t`.
#[derive(Debug)]
pub struct InvisibleCharRule;

impl Rule for InvisibleCharRule {
    fn name(&self) -> &str {
        "invisible_chars"
    }

    fn apply(&self, input: &str) -> String {
        input
            .chars()
            .filter(|&c| {
                c == STRESS_MARKER
                    || matches!(c, '\n' | '\r' | '\t')
                    || !(c.is_control() || is_format_char(c))
            })
            .collect()
    }
}

/// Non-breaking space to a regular space.
#[derive(Debug)]
pub struct NonBreakingSpaceRule;

impl Rule for NonBreakingSpaceRule {
    fn name(&self) -> &str {
        "non_breaking_space"
    }

    fn apply(&self, input: &str) -> String {
        input.replace('\u{00A0}', " ")
    }
}

/// Drop whitespace touching a newline, keeping the newlines themselves.
///
/// Blank lines survive as `\n\n`, which keeps paragraph boundaries and line
/// numbers intact.
#[derive(Debug)]
pub struct NewlineWhitespaceRule;

impl Rule for NewlineWhitespaceRule {
    fn name(&self) -> &str {
        "newline_whitespace"
    }

    fn apply(&self, input: &str) -> String {
        if !input.contains('\n') {
            return input.to_string();
        }

        let lines: Vec<&str> = input.split('\n').collect();
        let last = lines.len() - 1;

        lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let mut line = *line;
                if i > 0 {
                    line = line.trim_start();
                }
                if i < last {
                    line = line.trim_end();
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Unicode general category Cf (format characters).
fn is_format_char(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{0890}'..='\u{0891}'
            | '\u{08E2}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{110BD}'
            | '\u{110CD}'
            | '\u{13430}'..='\u{1343F}'
            | '\u{1BCA0}'..='\u{1BCA3}'
            | '\u{1D173}'..='\u{1D17A}'
            | '\u{E0001}'
            | '\u{E0020}'..='\u{E007F}'
    )
}
