//! Configuration structures for the pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Default token budget per chunk.
pub const DEFAULT_MAX_TOKENS: usize = 280;

/// Default number of addressable speaker slots.
pub const DEFAULT_MAX_SPEAKERS: usize = 30;

/// File names tried by [`SfxConfig::discover`], in order.
pub const SFX_CONFIG_CANDIDATES: &[&str] = &["sfx.yaml", "sound/sfx.yaml"];

/// Sound effect table, read from `sfx.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SfxConfig {
    /// Loudness target for normalized assets. `null` disables normalization.
    #[serde(default = "default_normalize_dbfs")]
    pub normalize_dbfs: Option<f32>,

    /// Target rate for SFX processed before any voice part fixed the rate.
    #[serde(default = "default_sample_rate", alias = "default_sample_rate")]
    pub default_sr: u32,

    /// Speed used when speed settings are ignored.
    #[serde(default = "default_speed")]
    pub default_speed: f32,

    /// Assets by id.
    #[serde(default)]
    pub sounds: BTreeMap<String, SfxAsset>,

    /// Directory the config was loaded from.
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

/// One sound effect asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SfxAsset {
    /// Audio file, absolute or relative to the searched directories.
    pub file: PathBuf,
    /// Fixed gain added after normalization.
    #[serde(default)]
    pub gain_db: f32,
    /// Whether to normalize loudness to `normalize_dbfs`.
    #[serde(default = "default_true")]
    pub normalize: bool,
}

fn default_normalize_dbfs() -> Option<f32> {
    Some(-16.0)
}

fn default_sample_rate() -> u32 {
    24000
}

fn default_speed() -> f32 {
    0.88
}

fn default_true() -> bool {
    true
}

impl Default for SfxConfig {
    fn default() -> Self {
        Self {
            normalize_dbfs: default_normalize_dbfs(),
            default_sr: default_sample_rate(),
            default_speed: default_speed(),
            sounds: BTreeMap::new(),
            config_dir: None,
        }
    }
}

impl SfxConfig {
    /// Parse from a YAML string.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file is a valid, empty table.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Load from a YAML file. Relative asset paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_yaml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.config_dir = path.parent().map(Path::to_path_buf);
        config.validate()?;

        debug!(
            path = %path.display(),
            sounds = config.sounds.len(),
            "Loaded SFX config"
        );
        Ok(config)
    }

    /// Look for `sfx.yaml` or `sound/sfx.yaml` under `base`.
    ///
    /// Returns the default (empty) table when neither exists.
    pub fn discover(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = base.as_ref();
        for candidate in SFX_CONFIG_CANDIDATES {
            let path = base.join(candidate);
            if path.is_file() {
                return Self::load(path);
            }
        }
        debug!(base = %base.display(), "No SFX config found, using defaults");
        Ok(Self::default())
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_sr == 0 {
            return Err(ConfigError::Invalid("default_sr must be positive".into()));
        }
        if !(self.default_speed.is_finite() && self.default_speed > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "default_speed must be positive, got {}",
                self.default_speed
            )));
        }
        Ok(())
    }

    /// Check whether an id is defined.
    pub fn contains(&self, id: &str) -> bool {
        self.sounds.contains_key(id)
    }

    /// Look up an asset.
    pub fn get(&self, id: &str) -> Option<&SfxAsset> {
        self.sounds.get(id)
    }
}

/// Batch run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory that receives `part_NNN.*` artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Interval between progress snapshots while a job runs.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Token budget for chunking. The pipeline caps its pre-split budget
    /// for oversized voice text at this value.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Use the default speed for every voice event.
    #[serde(default)]
    pub ignore_speed: bool,

    /// Write `part_NNN.txt` next to each voice artifact.
    #[serde(default)]
    pub save_text: bool,

    /// Number of addressable speaker slots. Voice events outside
    /// `1..=max_speakers` are rejected before synthesis.
    #[serde(default = "default_max_speakers")]
    pub max_speakers: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output_audio")
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}

fn default_max_speakers() -> usize {
    DEFAULT_MAX_SPEAKERS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            max_tokens: default_max_tokens(),
            ignore_speed: false,
            save_text: false,
            max_speakers: default_max_speakers(),
        }
    }
}

impl PipelineConfig {
    /// Progress polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Enable or disable text artifacts.
    pub fn with_save_text(mut self, save_text: bool) -> Self {
        self.save_text = save_text;
        self
    }

    /// Enable or disable the speed override.
    pub fn with_ignore_speed(mut self, ignore_speed: bool) -> Self {
        self.ignore_speed = ignore_speed;
        self
    }

    /// Set the token budget.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the number of speaker slots.
    pub fn with_max_speakers(mut self, max_speakers: usize) -> Self {
        self.max_speakers = max_speakers;
        self
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format (json or text).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,
    /// Exporter port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}
