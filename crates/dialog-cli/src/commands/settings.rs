//! Speaker settings commands: export and import of the settings file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use dialog_core::speakers::DEFAULT_SLOT_SPEED;

use super::load_speakers;

/// A `--set N=voice[:speed]` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotAssignment {
    pub slot: usize,
    pub voice: Option<String>,
    pub speed: f32,
}

/// Parse `N=voice[:speed]`. The speed accepts a comma or a dot.
pub fn parse_assignment(raw: &str) -> Result<SlotAssignment, String> {
    let (slot, rest) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected N=voice[:speed], got '{raw}'"))?;
    let slot: usize = slot
        .trim()
        .trim_start_matches("#g")
        .parse()
        .map_err(|_| format!("invalid slot number in '{raw}'"))?;

    let (voice, speed) = match rest.rsplit_once(':') {
        Some((voice, speed)) => {
            let speed: f32 = speed
                .trim()
                .replace(',', ".")
                .parse()
                .map_err(|_| format!("invalid speed in '{raw}'"))?;
            (voice, speed)
        }
        None => (rest, DEFAULT_SLOT_SPEED),
    };

    let voice = voice.trim();
    Ok(SlotAssignment {
        slot,
        voice: (!voice.is_empty()).then(|| voice.to_string()),
        speed,
    })
}

/// Write a settings file, starting from `from` when given.
pub fn export(
    from: Option<&Path>,
    assignments: &[SlotAssignment],
    dir: &Path,
    as_default: bool,
    max_speakers: usize,
) -> Result<PathBuf> {
    let mut table = load_speakers(from, max_speakers)?;
    for a in assignments {
        if !table.set(a.slot, a.voice.clone(), a.speed) {
            bail!("slot #g{} is out of range 1..={max_speakers}", a.slot);
        }
    }

    let path = if as_default {
        table.save_default(dir)
    } else {
        table.save_export(dir)
    }
    .context("cannot save speaker settings")?;

    println!("Saved {}", path.display());
    Ok(path)
}

/// Read a settings file and print the resulting table.
pub fn import(file: &Path, max_speakers: usize) -> Result<()> {
    let table = load_speakers(Some(file), max_speakers)?;

    for (n, slot) in table.iter() {
        if let Some(voice) = &slot.voice {
            println!("#g{n:<3} {voice:<24} speed {:.2}", slot.speed);
        }
    }
    Ok(())
}
