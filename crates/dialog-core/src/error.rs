//! Error taxonomy for the dialogue pipeline.

use std::path::PathBuf;

/// Malformed script input. Fatal before any synthesis starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A voice tag with nothing to say.
    #[error("line {line}: empty text after tag #g{slot}")]
    EmptyTextAfterTag { line: usize, slot: usize },

    /// A voice tag addressing a slot outside `1..=max`.
    #[error("line {line}: speaker #g{n} is out of range 1..={max}")]
    SpeakerOutOfRange { line: usize, n: usize, max: usize },

    /// An SFX line whose id is not in the asset table.
    #[error("line {line}: SFX id '{id}' is not defined in the SFX config")]
    UnknownSfxId { line: usize, id: String },
}

impl ParseError {
    /// Line the error refers to.
    pub fn line(&self) -> usize {
        match self {
            Self::EmptyTextAfterTag { line, .. }
            | Self::SpeakerOutOfRange { line, .. }
            | Self::UnknownSfxId { line, .. } => *line,
        }
    }
}

/// Failure while loading or processing a sound effect.
#[derive(Debug, thiserror::Error)]
pub enum SfxError {
    /// The id has no entry in the asset table.
    #[error("no SFX config entry for id '{id}'")]
    MissingAssetConfig { id: String },

    /// None of the candidate paths exists.
    #[error("SFX file for id '{id}' not found, tried: {}", display_paths(tried))]
    AssetNotFound { id: String, tried: Vec<PathBuf> },

    /// The audio file could not be read.
    #[error("cannot decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Resampler construction or processing failed.
    #[error("resampling failed: {0}")]
    Resample(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure reported by a synthesis backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    /// The input exceeded the encoder's hard length limit.
    #[error("input too long for the encoder: {0}")]
    InputTooLong(String),

    /// Any other backend failure.
    #[error("synthesis backend error: {0}")]
    Backend(String),
}

impl SynthesisError {
    pub fn input_too_long(msg: impl Into<String>) -> Self {
        Self::InputTooLong(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Whether a finer split of the input could fix this failure.
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::InputTooLong(_))
    }
}

/// Failure while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("configuration error: {0}")]
    Invalid(String),
}

/// Failure while saving or loading speaker settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no speaker settings found in {0}")]
    Empty(PathBuf),
}

/// Fatal error of a batch run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("script error: {0}")]
    Parse(#[from] ParseError),

    /// The backend overflowed again after the finer split.
    #[error("part {index}: input still too long after re-splitting: {source}")]
    SynthesisOverflow {
        index: usize,
        #[source]
        source: SynthesisError,
    },

    #[error("part {index}: {source}")]
    Synthesis {
        index: usize,
        #[source]
        source: SynthesisError,
    },

    #[error("part {index} (#{id}): {source}")]
    Asset {
        index: usize,
        id: String,
        #[source]
        source: SfxError,
    },

    #[error("part {index}: cannot write {path}: {message}")]
    Artifact {
        index: usize,
        path: PathBuf,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The worker running a job panicked or was torn down.
    #[error("part {index}: worker failed: {message}")]
    Worker { index: usize, message: String },
}

impl PipelineError {
    /// The 1-based event index the error belongs to, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::SynthesisOverflow { index, .. }
            | Self::Synthesis { index, .. }
            | Self::Asset { index, .. }
            | Self::Artifact { index, .. }
            | Self::Worker { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Convenience type alias for run-level results.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::UnknownSfxId {
            line: 7,
            id: "thunder".into(),
        };
        assert_eq!(
            err.to_string(),
            "line 7: SFX id 'thunder' is not defined in the SFX config"
        );
        assert_eq!(err.line(), 7);

        let err = ParseError::SpeakerOutOfRange {
            line: 2,
            n: 31,
            max: 30,
        };
        assert_eq!(err.to_string(), "line 2: speaker #g31 is out of range 1..=30");
    }

    #[test]
    fn test_asset_not_found_lists_paths() {
        let err = SfxError::AssetNotFound {
            id: "door".into(),
            tried: vec![PathBuf::from("a/door.wav"), PathBuf::from("b/door.wav")],
        };
        let msg = err.to_string();
        assert!(msg.contains("a/door.wav, b/door.wav"));
    }

    #[test]
    fn test_synthesis_error_kind() {
        assert!(SynthesisError::input_too_long("513 > 512").is_overflow());
        assert!(!SynthesisError::backend("cuda oom").is_overflow());
    }

    #[test]
    fn test_pipeline_error_index() {
        let err = PipelineError::SynthesisOverflow {
            index: 4,
            source: SynthesisError::input_too_long("x"),
        };
        assert_eq!(err.index(), Some(4));
        assert!(err.to_string().starts_with("part 4:"));

        let err: PipelineError = ParseError::EmptyTextAfterTag { line: 1, slot: 2 }.into();
        assert_eq!(err.index(), None);
    }
}
