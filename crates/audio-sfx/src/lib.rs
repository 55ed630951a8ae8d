//! # audio-sfx
//!
//! Sound-effect processing for the dialogue pipeline.
//!
//! [`SfxProcessor::load_and_process`] takes an id from the SFX table and
//! returns audio ready to drop between voice parts:
//! - the asset file is found by probing an ordered list of directories
//! - channels are averaged to mono and the rate converted to the target
//! - loudness is normalized to the configured dBFS, then the asset gain added
//! - 30 ms linear fades are applied at both edges

pub mod resample;
pub mod wav;

use std::path::{Path, PathBuf};

use dialog_core::{AudioBuffer, SfxAsset, SfxConfig, SfxError};
use tracing::{debug, info, instrument};

pub use wav::{FADE_MS, read_wav_mono, write_wav_samples};

/// Loads and conditions sound effects from an [`SfxConfig`].
#[derive(Debug, Clone)]
pub struct SfxProcessor {
    config: SfxConfig,
    search_dirs: Vec<PathBuf>,
}

impl SfxProcessor {
    /// Create a processor over an SFX table.
    pub fn new(config: SfxConfig) -> Self {
        Self {
            config,
            search_dirs: Vec::new(),
        }
    }

    /// Add a directory searched after the config directory.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    pub fn config(&self) -> &SfxConfig {
        &self.config
    }

    /// Paths tried for an asset file, in order, without duplicates.
    pub fn candidate_paths(&self, file: &Path) -> Vec<PathBuf> {
        let mut candidates = vec![file.to_path_buf()];

        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(file));
        }
        if let Some(dir) = &self.config.config_dir {
            candidates.push(dir.join(file));
            candidates.push(dir.join("sound").join(file));
        }
        for dir in &self.search_dirs {
            candidates.push(dir.join(file));
            candidates.push(dir.join("sound").join(file));
        }

        let mut seen = Vec::with_capacity(candidates.len());
        for path in candidates {
            if !seen.contains(&path) {
                seen.push(path);
            }
        }
        seen
    }

    /// Find the file of an asset.
    pub fn resolve_path(&self, id: &str, asset: &SfxAsset) -> Result<PathBuf, SfxError> {
        let tried = self.candidate_paths(&asset.file);
        match tried.iter().find(|p| p.is_file()) {
            Some(path) => {
                debug!(id, path = %path.display(), "SFX file resolved");
                Ok(path.clone())
            }
            None => Err(SfxError::AssetNotFound {
                id: id.to_string(),
                tried,
            }),
        }
    }

    /// Load an effect and condition it for playback at `target_sample_rate`.
    #[instrument(skip(self))]
    pub fn load_and_process(
        &self,
        id: &str,
        target_sample_rate: u32,
    ) -> Result<AudioBuffer, SfxError> {
        let asset = self
            .config
            .get(id)
            .ok_or_else(|| SfxError::MissingAssetConfig { id: id.to_string() })?;

        let path = self.resolve_path(id, asset)?;
        let (samples, source_rate) = wav::read_wav_mono(&path)?;
        let mut samples = resample::resample(&samples, source_rate, target_sample_rate)?;

        let current_dbfs = wav::rms_dbfs(&samples);
        let mut gain_db = asset.gain_db;
        if let (true, Some(target), Some(current)) =
            (asset.normalize, self.config.normalize_dbfs, current_dbfs)
        {
            gain_db += target - current;
        }
        wav::apply_gain_db(&mut samples, gain_db);
        wav::apply_edge_fades(&mut samples, FADE_MS, target_sample_rate);

        info!(
            id,
            source_rate,
            target_sample_rate,
            samples = samples.len(),
            current_dbfs = current_dbfs.unwrap_or(f32::NEG_INFINITY),
            gain_db,
            "SFX processed"
        );

        Ok(AudioBuffer::new(samples, target_sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config_with(dir: &Path, assets: &[(&str, &str, f32, bool)]) -> SfxConfig {
        let sounds: BTreeMap<String, SfxAsset> = assets
            .iter()
            .map(|(id, file, gain_db, normalize)| {
                (
                    id.to_string(),
                    SfxAsset {
                        file: PathBuf::from(file),
                        gain_db: *gain_db,
                        normalize: *normalize,
                    },
                )
            })
            .collect();

        SfxConfig {
            sounds,
            config_dir: Some(dir.to_path_buf()),
            ..SfxConfig::default()
        }
    }

    #[test]
    fn test_missing_config_entry() {
        let dir = tempfile::tempdir().unwrap();
        let processor = SfxProcessor::new(config_with(dir.path(), &[]));
        assert!(matches!(
            processor.load_and_process("bell", 24000),
            Err(SfxError::MissingAssetConfig { id }) if id == "bell"
        ));
    }

    #[test]
    fn test_asset_not_found_lists_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let extra = tempfile::tempdir().unwrap();
        let processor = SfxProcessor::new(config_with(
            dir.path(),
            &[("bell", "no_such_bell.wav", 0.0, true)],
        ))
        .with_search_dir(extra.path());

        match processor.load_and_process("bell", 24000) {
            Err(SfxError::AssetNotFound { id, tried }) => {
                assert_eq!(id, "bell");
                assert!(tried.contains(&dir.path().join("no_such_bell.wav")));
                assert!(tried.contains(&dir.path().join("sound").join("no_such_bell.wav")));
                assert!(tried.contains(&extra.path().join("sound").join("no_such_bell.wav")));
            }
            other => panic!("expected AssetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_candidate_order() {
        let processor = SfxProcessor::new(config_with(Path::new("/cfg"), &[]))
            .with_search_dir("/extra");
        let candidates = processor.candidate_paths(Path::new("a.wav"));

        assert_eq!(candidates[0], PathBuf::from("a.wav"));
        let cfg_pos = candidates.iter().position(|p| p == Path::new("/cfg/a.wav")).unwrap();
        let sound_pos = candidates
            .iter()
            .position(|p| p == Path::new("/cfg/sound/a.wav"))
            .unwrap();
        let extra_pos = candidates.iter().position(|p| p == Path::new("/extra/a.wav")).unwrap();
        assert!(cfg_pos < sound_pos && sound_pos < extra_pos);
    }
}
