//! Line classification.

use dialog_core::SpeedSuffix;
use once_cell::sync::Lazy;
use regex::Regex;

/// `#g<N>[_<suffix>]` followed by `:`, whitespace or end of line.
static VOICE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#g\s*(\d+)(?:_([^\s:]*))?(?:\s*:\s*|\s+|$)(.*)$")
        .expect("voice tag pattern is valid")
});

/// `#<id>` alone on its line.
static SFX_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([A-Za-z0-9_-]+)$").expect("sfx tag pattern is valid"));

/// What a single trimmed, non-empty line is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// A speaker line. `slot` is unchecked; `suffix` is the raw suffix body.
    Voice {
        slot: usize,
        suffix: Option<&'a str>,
        text: &'a str,
    },
    /// A sound-effect reference.
    Sfx { id: &'a str },
    /// A `#` line that is neither of the above.
    Comment,
    /// Untagged text.
    Narration { text: &'a str },
}

/// Classify one trimmed, non-empty line.
pub fn classify(line: &str) -> Line<'_> {
    if let Some(caps) = VOICE_TAG.captures(line) {
        let slot = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(usize::MAX);
        let suffix = caps.get(2).map(|m| m.as_str());
        let text = caps.get(3).map_or("", |m| m.as_str().trim());
        return Line::Voice { slot, suffix, text };
    }

    if let Some(caps) = SFX_TAG.captures(line) {
        if let Some(id) = caps.get(1) {
            return Line::Sfx { id: id.as_str() };
        }
    }

    if line.starts_with('#') {
        Line::Comment
    } else {
        Line::Narration { text: line }
    }
}

/// Outcome of reading a raw suffix body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixReading {
    None,
    Known(SpeedSuffix),
    Unknown,
}

/// Interpret a raw suffix body.
pub fn read_suffix(raw: Option<&str>) -> SuffixReading {
    match raw {
        None => SuffixReading::None,
        Some(body) => match SpeedSuffix::parse(body) {
            Some(suffix) => SuffixReading::Known(suffix),
            None => SuffixReading::Unknown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_lines() {
        assert_eq!(
            classify("#g1: Привіт."),
            Line::Voice {
                slot: 1,
                suffix: None,
                text: "Привіт."
            }
        );
        assert_eq!(
            classify("#G12_Fast95 :  Так"),
            Line::Voice {
                slot: 12,
                suffix: Some("Fast95"),
                text: "Так"
            }
        );
        assert_eq!(
            classify("#g3 без двокрапки"),
            Line::Voice {
                slot: 3,
                suffix: None,
                text: "без двокрапки"
            }
        );
        assert_eq!(
            classify("#g4"),
            Line::Voice {
                slot: 4,
                suffix: None,
                text: ""
            }
        );
    }

    #[test]
    fn test_sfx_lines() {
        assert_eq!(classify("#door_knock"), Line::Sfx { id: "door_knock" });
        assert_eq!(classify("#bell-2"), Line::Sfx { id: "bell-2" });
        // Letters after the number make it an id, not a voice tag
        assert_eq!(classify("#g1x"), Line::Sfx { id: "g1x" });
    }

    #[test]
    fn test_comments_and_narration() {
        assert_eq!(classify("# just a note"), Line::Comment);
        assert_eq!(classify("#!?"), Line::Comment);
        assert_eq!(
            classify("Звичайний текст"),
            Line::Narration {
                text: "Звичайний текст"
            }
        );
    }

    #[test]
    fn test_huge_slot_number() {
        assert!(matches!(
            classify("#g99999999999999999999999: x"),
            Line::Voice {
                slot: usize::MAX,
                ..
            }
        ));
    }

    #[test]
    fn test_read_suffix() {
        assert_eq!(read_suffix(None), SuffixReading::None);
        assert_eq!(
            read_suffix(Some("slow")),
            SuffixReading::Known(SpeedSuffix::Slow)
        );
        assert_eq!(
            read_suffix(Some("fast110")),
            SuffixReading::Known(SpeedSuffix::FastPercent(110))
        );
        assert_eq!(read_suffix(Some("loud")), SuffixReading::Unknown);
        assert_eq!(read_suffix(Some("slow0")), SuffixReading::Unknown);
    }
}
