//! # script-parser
//!
//! Turns a tagged dialogue script into an ordered list of [`Event`]s.
//!
//! Grammar, one item per line:
//! - `#g<N>[_slow|_fast|_slowNN|_fastNN]: text` - a voice line for slot `N`
//! - `#<sfx_id>` - a sound effect from the SFX table
//! - any other `#` line - a comment
//! - anything else - narration for slot 1
//!
//! Voice text is split with the [`Chunker`], one event per chunk. Parsing is
//! fail-fast: the first malformed line aborts with a line-numbered
//! [`ParseError`].

pub mod grammar;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use dialog_core::{
    DEFAULT_MAX_SPEAKERS, DEFAULT_MAX_TOKENS, Event, NormalizedText, ParseError, SfxConfig,
    SfxEvent, SpeedSuffix, VoiceEvent,
};
use text_chunker::Chunker;
use tracing::{debug, instrument, warn};

use grammar::{Line, SuffixReading};

/// Slot that receives untagged narration.
pub const NARRATION_SLOT: usize = 1;

/// Script parser bound to a chunker and an SFX id table.
#[derive(Debug, Clone)]
pub struct ScriptParser {
    chunker: Arc<Chunker>,
    sfx_ids: HashSet<String>,
    max_speakers: usize,
    max_tokens: usize,
}

impl ScriptParser {
    /// Create a parser with no SFX ids and the default limits.
    pub fn new(chunker: Arc<Chunker>) -> Self {
        Self {
            chunker,
            sfx_ids: HashSet::new(),
            max_speakers: DEFAULT_MAX_SPEAKERS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Accept the ids defined in an SFX config.
    pub fn with_sfx_config(mut self, config: &SfxConfig) -> Self {
        self.sfx_ids = config.sounds.keys().cloned().collect();
        self
    }

    /// Accept an explicit set of SFX ids.
    pub fn with_sfx_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sfx_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set the highest addressable speaker slot.
    pub fn with_max_speakers(mut self, max_speakers: usize) -> Self {
        self.max_speakers = max_speakers;
        self
    }

    /// Set the token budget for voice chunks.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_speakers(&self) -> usize {
        self.max_speakers
    }

    /// Normalize raw script text, then parse it.
    pub fn parse_str(
        &self,
        script: &str,
        voices: &[Option<String>],
    ) -> Result<Vec<Event>, ParseError> {
        self.parse(&text_normalizer::normalize(script), voices)
    }

    /// Parse a normalized script.
    ///
    /// `voices[i]` is the voice of slot `i + 1`; slots referenced without a
    /// voice are reported with a warning but still parsed.
    #[instrument(skip(self, text, voices), fields(text_len = text.char_len()))]
    pub fn parse(
        &self,
        text: &NormalizedText,
        voices: &[Option<String>],
    ) -> Result<Vec<Event>, ParseError> {
        let mut events = Vec::new();

        for (index, raw) in text.as_str().lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }

            match grammar::classify(trimmed) {
                Line::Voice { slot, suffix, text } => {
                    if text.is_empty() {
                        return Err(ParseError::EmptyTextAfterTag { line, slot });
                    }
                    self.check_slot(line, slot)?;
                    let suffix = self.resolve_suffix(line, slot, suffix);
                    self.push_voice(&mut events, line, slot, suffix, text);
                }
                Line::Sfx { id } => {
                    if !self.sfx_ids.contains(id) {
                        return Err(ParseError::UnknownSfxId {
                            line,
                            id: id.to_string(),
                        });
                    }
                    events.push(Event::Sfx(SfxEvent {
                        id: id.to_string(),
                        line,
                    }));
                }
                Line::Comment => debug!(line, "Skipping comment"),
                Line::Narration { text } => {
                    self.push_voice(&mut events, line, NARRATION_SLOT, None, text);
                }
            }
        }

        self.warn_missing_voices(&events, voices);
        debug!(events = events.len(), "Script parsed");
        Ok(events)
    }

    /// Slots a script refers to, including slot 1 for narration. Lines that
    /// would not parse are ignored.
    pub fn speakers_used(&self, script: &str) -> BTreeSet<usize> {
        script
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(|l| match grammar::classify(l) {
                Line::Voice { slot, .. } if (1..=self.max_speakers).contains(&slot) => Some(slot),
                Line::Narration { .. } => Some(NARRATION_SLOT),
                _ => None,
            })
            .collect()
    }

    fn check_slot(&self, line: usize, slot: usize) -> Result<(), ParseError> {
        if (1..=self.max_speakers).contains(&slot) {
            Ok(())
        } else {
            Err(ParseError::SpeakerOutOfRange {
                line,
                n: slot,
                max: self.max_speakers,
            })
        }
    }

    fn resolve_suffix(&self, line: usize, slot: usize, raw: Option<&str>) -> Option<SpeedSuffix> {
        match grammar::read_suffix(raw) {
            SuffixReading::None => None,
            SuffixReading::Known(suffix) => Some(suffix),
            SuffixReading::Unknown => {
                warn!(
                    line,
                    slot,
                    suffix = raw.unwrap_or_default(),
                    "Unknown speed suffix, using the speaker's slider speed"
                );
                None
            }
        }
    }

    fn push_voice(
        &self,
        events: &mut Vec<Event>,
        line: usize,
        slot: usize,
        suffix: Option<SpeedSuffix>,
        text: &str,
    ) {
        let chunks = self
            .chunker
            .split(&NormalizedText::new(text), self.max_tokens);
        if chunks.len() > 1 {
            debug!(line, chunks = chunks.len(), "Voice line split into chunks");
        }

        events.extend(chunks.into_iter().map(|chunk| {
            Event::Voice(VoiceEvent {
                slot,
                suffix,
                text: chunk,
                line,
            })
        }));
    }

    fn warn_missing_voices(&self, events: &[Event], voices: &[Option<String>]) {
        let missing: BTreeSet<usize> = events
            .iter()
            .filter_map(|e| match e {
                Event::Voice(v) => Some(v.slot),
                Event::Sfx(_) => None,
            })
            .filter(|slot| {
                voices
                    .get(slot - 1)
                    .and_then(|v| v.as_deref())
                    .is_none_or(|v| v.trim().is_empty())
            })
            .collect();

        for slot in missing {
            warn!(slot, "No voice assigned to speaker #g{slot}");
        }
    }
}
