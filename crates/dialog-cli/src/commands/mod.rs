//! CLI command implementations.

pub mod chunk;
pub mod info;
pub mod normalize;
pub mod parse;
pub mod run;
pub mod settings;

use std::path::Path;

use anyhow::{Context, Result, bail};
use dialog_core::{SfxConfig, SpeakerTable};
use tracing::info;

/// Resolve an input argument: `@path` reads a file, anything else is literal.
pub fn read_input(input: &str) -> Result<String> {
    let text = if let Some(path) = input.strip_prefix('@') {
        info!(path, "Reading input from file");
        std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?
    } else {
        input.to_string()
    };

    if text.trim().is_empty() {
        bail!("input text is empty");
    }
    Ok(text)
}

/// Load the SFX table from `path`, or discover it in the working directory.
pub fn load_sfx_config(path: Option<&Path>) -> Result<SfxConfig> {
    match path {
        Some(path) => SfxConfig::load(path)
            .with_context(|| format!("cannot load SFX config {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("cannot read working directory")?;
            SfxConfig::discover(&cwd).context("cannot load discovered SFX config")
        }
    }
}

/// Build a speaker table, applying a settings file when given.
pub fn load_speakers(path: Option<&Path>, max_speakers: usize) -> Result<SpeakerTable> {
    let mut table = SpeakerTable::new(max_speakers);
    if let Some(path) = path {
        table
            .load(path)
            .with_context(|| format!("cannot load speaker settings {}", path.display()))?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_literal_input() {
        assert_eq!(read_input("#g1: Так.").unwrap(), "#g1: Так.");
        assert!(read_input("   ").is_err());
    }

    #[test]
    fn test_read_file_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.txt");
        std::fs::write(&path, "Оповідь.").unwrap();

        let arg = format!("@{}", path.display());
        assert_eq!(read_input(&arg).unwrap(), "Оповідь.");
        assert!(read_input("@/no/such/file.txt").is_err());
    }

    #[test]
    fn test_load_speakers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speakers.txt");
        std::fs::write(&path, "#g2:Petro швидкість:1,10;\n").unwrap();

        let table = load_speakers(Some(&path), 30).unwrap();
        assert_eq!(table.voice(2), Some("Petro"));
        assert_eq!(load_speakers(None, 4).unwrap().max_speakers(), 4);
    }

    #[test]
    fn test_load_sfx_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sfx.yaml");
        std::fs::write(&path, "sounds:\n  door: { file: door.wav }\n").unwrap();

        let config = load_sfx_config(Some(&path)).unwrap();
        assert!(config.contains("door"));
        assert_eq!(config.config_dir.as_deref(), Some(dir.path()));
    }
}
