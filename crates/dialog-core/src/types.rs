//! Core data types for the dialogue pipeline.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Text that has been through the normalizer.
///
/// Canonical unicode form, no control characters except `\n`, `\r` and `\t`,
/// and every `+` stress marker of the input preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedText(String);

impl NormalizedText {
    /// Wrap text that has already been normalized.
    ///
    /// Normalizer implementations are the intended callers; wrapping raw
    /// input here skips the canonicalization guarantees.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Borrow the text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Check if the text is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A piece of text that fits the token budget and the character cap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chunk(String);

impl Chunk {
    /// Wrap a string that the chunker has validated.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl PartialEq<&str> for Chunk {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Speed modifier attached to a voice tag (`#g2_fast: ...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedSuffix {
    /// `_slow`, fixed 0.80.
    Slow,
    /// `_fast`, fixed 1.20.
    Fast,
    /// `_slowNN`, NN percent.
    SlowPercent(u16),
    /// `_fastNN`, NN percent.
    FastPercent(u16),
}

impl SpeedSuffix {
    /// Speed factor of the plain `_slow` suffix.
    pub const SLOW_FACTOR: f32 = 0.80;
    /// Speed factor of the plain `_fast` suffix.
    pub const FAST_FACTOR: f32 = 1.20;

    /// Parse a suffix body (the part after `_`), case-insensitively.
    ///
    /// Returns `None` for anything that is not `slow`, `fast`, or one of them
    /// followed by 1-3 digits of a non-zero percentage.
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.to_ascii_lowercase();
        let (fast, digits) = if let Some(rest) = lower.strip_prefix("slow") {
            (false, rest)
        } else if let Some(rest) = lower.strip_prefix("fast") {
            (true, rest)
        } else {
            return None;
        };

        if digits.is_empty() {
            return Some(if fast { Self::Fast } else { Self::Slow });
        }
        if digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let pct: u16 = digits.parse().ok()?;
        if pct == 0 {
            return None;
        }
        Some(if fast {
            Self::FastPercent(pct)
        } else {
            Self::SlowPercent(pct)
        })
    }

    /// The speed factor this suffix requests.
    pub fn factor(self) -> f32 {
        match self {
            Self::Slow => Self::SLOW_FACTOR,
            Self::Fast => Self::FAST_FACTOR,
            Self::SlowPercent(p) | Self::FastPercent(p) => f32::from(p) / 100.0,
        }
    }
}

impl fmt::Display for SpeedSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slow => write!(f, "slow"),
            Self::Fast => write!(f, "fast"),
            Self::SlowPercent(p) => write!(f, "slow{p}"),
            Self::FastPercent(p) => write!(f, "fast{p}"),
        }
    }
}

/// A line of dialogue for one speaker slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceEvent {
    /// Speaker slot, 1-based.
    pub slot: usize,
    /// Speed modifier from the tag, if any.
    pub suffix: Option<SpeedSuffix>,
    /// Text to synthesize.
    pub text: Chunk,
    /// Source line (1-based).
    pub line: usize,
}

/// A sound effect reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SfxEvent {
    /// Asset id from the SFX table.
    pub id: String,
    /// Source line (1-based).
    pub line: usize,
}

/// One scheduled unit of work, in playback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Voice(VoiceEvent),
    Sfx(SfxEvent),
}

impl Event {
    /// Source line the event came from.
    pub fn line(&self) -> usize {
        match self {
            Event::Voice(v) => v.line,
            Event::Sfx(s) => s.line,
        }
    }

    /// Short description used in progress and log output.
    pub fn describe(&self) -> String {
        match self {
            Event::Voice(v) => v.text.as_str().to_string(),
            Event::Sfx(s) => format!("#{}", s.id),
        }
    }

    pub fn is_voice(&self) -> bool {
        matches!(self, Event::Voice(_))
    }
}

/// Mono PCM audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Get the number of samples.
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Get the duration in milliseconds.
    pub fn duration_ms(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 * 1000.0 / self.sample_rate as f32
    }

    /// Append another buffer recorded at the same rate.
    pub fn append(&mut self, other: AudioBuffer) {
        debug_assert_eq!(self.sample_rate, other.sample_rate);
        self.samples.extend(other.samples);
    }
}

/// A request to the synthesis backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Text to synthesize.
    pub text: String,
    /// Speaker slot (1-based).
    pub slot: usize,
    /// Effective playback speed.
    pub speed: f32,
    /// Voice assigned to the slot.
    pub voice: Option<String>,
}

impl SynthesisRequest {
    /// Create a request for slot 1 at normal speed.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            slot: 1,
            speed: 1.0,
            voice: None,
        }
    }

    /// Set the speaker slot.
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = slot;
        self
    }

    /// Set the playback speed.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Set the voice.
    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice;
        self
    }
}

/// Lifecycle of one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not started.
    #[default]
    Idle,
    /// Working on event `index` (1-based) of `total`.
    Running { index: usize, total: usize },
    /// All events finished.
    Completed,
    /// Stopped by the caller before the next event.
    Cancelled,
    /// Aborted by a fatal error.
    Failed,
}

impl RunState {
    /// Check whether the run has stopped for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// A progress report emitted during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Run state at the time of the snapshot.
    pub state: RunState,
    /// Number of events whose artifacts are written.
    pub completed_index: usize,
    /// Total number of events.
    pub total: usize,
    /// Time since the run started.
    pub elapsed: Duration,
    /// Artifact written by the event that just completed.
    pub last_artifact_path: Option<PathBuf>,
    /// Estimated wall-clock completion time.
    pub eta: Option<DateTime<Local>>,
    /// Estimated time left.
    pub remaining: Option<Duration>,
    /// Human readable form of `remaining`.
    pub remaining_text: String,
}

impl ProgressSnapshot {
    /// Completion ratio in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed_index as f32 / self.total as f32
    }
}
