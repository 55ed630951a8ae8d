//! Speaker slots and the speaker settings file.
//!
//! The settings file holds one line per slot:
//!
//! ```text
//! #g1:Anna швидкість:0,95;
//! #g2: швидкість:1,00;
//! ```
//!
//! Speeds use a comma as the decimal separator. On import, speeds are clamped
//! to the slider range and lines that do not match are ignored.

use std::path::{Path, PathBuf};

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DEFAULT_MAX_SPEAKERS;
use crate::error::SettingsError;
use crate::speed::SLIDER_RANGE;

/// Slider speed of a slot that was never configured.
pub const DEFAULT_SLOT_SPEED: f32 = 1.0;

/// Name of the settings file written by [`SpeakerTable::save_default`].
pub const DEFAULT_SETTINGS_FILE: &str = "speakers_settings.txt";

static SETTINGS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#g(\d{1,4})\s*:\s*(.*?)\s*швидкість\s*:\s*([0-9]+(?:[.,][0-9]+)?)\s*;\s*$")
        .expect("settings line pattern is valid")
});

/// Voice and slider speed of one speaker slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSlot {
    /// Voice assigned to the slot.
    pub voice: Option<String>,
    /// Slider speed.
    pub speed: f32,
}

impl Default for SpeakerSlot {
    fn default() -> Self {
        Self {
            voice: None,
            speed: DEFAULT_SLOT_SPEED,
        }
    }
}

/// Per-slot voice and speed settings, owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerTable {
    slots: Vec<SpeakerSlot>,
}

impl Default for SpeakerTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SPEAKERS)
    }
}

impl SpeakerTable {
    /// Create a table of `max_speakers` unconfigured slots.
    pub fn new(max_speakers: usize) -> Self {
        Self {
            slots: vec![SpeakerSlot::default(); max_speakers],
        }
    }

    /// Build a table from parallel voice and speed lists.
    ///
    /// Missing speeds default to [`DEFAULT_SLOT_SPEED`].
    pub fn from_parts(voices: Vec<Option<String>>, speeds: &[f32]) -> Self {
        let slots = voices
            .into_iter()
            .enumerate()
            .map(|(i, voice)| SpeakerSlot {
                voice,
                speed: speeds.get(i).copied().unwrap_or(DEFAULT_SLOT_SPEED),
            })
            .collect();
        Self { slots }
    }

    /// Number of slots.
    pub fn max_speakers(&self) -> usize {
        self.slots.len()
    }

    /// Slot by 1-based number.
    pub fn get(&self, slot: usize) -> Option<&SpeakerSlot> {
        slot.checked_sub(1).and_then(|i| self.slots.get(i))
    }

    /// Replace a slot. Returns `false` when `slot` is out of range.
    pub fn set(&mut self, slot: usize, voice: Option<String>, speed: f32) -> bool {
        match slot.checked_sub(1).and_then(|i| self.slots.get_mut(i)) {
            Some(entry) => {
                *entry = SpeakerSlot { voice, speed };
                true
            }
            None => false,
        }
    }

    /// Voice of a slot.
    pub fn voice(&self, slot: usize) -> Option<&str> {
        self.get(slot).and_then(|s| s.voice.as_deref())
    }

    /// Voices of all slots, in order.
    pub fn voices(&self) -> Vec<Option<String>> {
        self.slots.iter().map(|s| s.voice.clone()).collect()
    }

    /// Slider speeds of all slots, in order.
    pub fn speeds(&self) -> Vec<f32> {
        self.slots.iter().map(|s| s.speed).collect()
    }

    /// Iterate `(slot_number, slot)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SpeakerSlot)> {
        self.slots.iter().enumerate().map(|(i, s)| (i + 1, s))
    }

    /// Render the settings file.
    pub fn export_settings(&self) -> String {
        let mut out = String::new();
        for (n, slot) in self.iter() {
            let voice = slot.voice.as_deref().unwrap_or("").trim();
            let speed = format!("{:.2}", slot.speed).replace('.', ",");
            out.push_str(&format!("#g{n}:{voice} швидкість:{speed};\n"));
        }
        out
    }

    /// Apply a settings file onto this table.
    ///
    /// Returns the number of slots updated.
    pub fn import_settings(&mut self, content: &str) -> usize {
        let mut updated = 0;

        for line in content.lines() {
            let Some(caps) = SETTINGS_LINE.captures(line.trim()) else {
                continue;
            };

            let Ok(slot) = caps[1].parse::<usize>() else {
                continue;
            };
            let Some(entry) = slot.checked_sub(1).and_then(|i| self.slots.get_mut(i)) else {
                debug!(slot, "Ignoring settings line for slot out of range");
                continue;
            };

            let voice = caps[2].trim();
            let speed = caps[3]
                .replace(',', ".")
                .parse::<f32>()
                .unwrap_or(entry.speed)
                .clamp(*SLIDER_RANGE.start(), *SLIDER_RANGE.end());

            *entry = SpeakerSlot {
                voice: (!voice.is_empty()).then(|| voice.to_string()),
                speed,
            };
            updated += 1;
        }

        updated
    }

    /// Write the settings into `<dir>/_exports/` under a unique name.
    pub fn save_export(&self, dir: impl AsRef<Path>) -> Result<PathBuf, SettingsError> {
        let export_root = dir.as_ref().join("_exports");
        let id = uuid::Uuid::new_v4().simple().to_string();
        let name = format!(
            "speakers_settings_{}_{}.txt",
            Local::now().format("%Y%m%d_%H%M%S"),
            &id[..6]
        );
        self.write_to(&export_root, &export_root.join(name))
    }

    /// Write the settings into `<dir>/speakers_settings.txt`.
    pub fn save_default(&self, dir: impl AsRef<Path>) -> Result<PathBuf, SettingsError> {
        let dir = dir.as_ref();
        self.write_to(dir, &dir.join(DEFAULT_SETTINGS_FILE))
    }

    fn write_to(&self, dir: &Path, path: &Path) -> Result<PathBuf, SettingsError> {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        std::fs::write(path, self.export_settings()).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), "Speaker settings saved");
        Ok(path.to_path_buf())
    }

    /// Read a settings file and apply it onto this table.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<usize, SettingsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match self.import_settings(&content) {
            0 => Err(SettingsError::Empty(path.to_path_buf())),
            n => {
                info!(path = %path.display(), slots = n, "Speaker settings loaded");
                Ok(n)
            }
        }
    }
}
