//! # text-tokenizer
//!
//! Token counting used to size chunks for the synthesis encoder.
//!
//! Two [`TokenCounter`] implementations are provided:
//! - [`Tokenizer`]: exact counts from a HuggingFace `tokenizer.json`
//! - [`HeuristicCounter`]: `characters + margin`, for when no tokenizer is
//!   available
//!
//! # Example
//!
//! ```ignore
//! use text_tokenizer::{counter_from_path, Tokenizer};
//! use dialog_core::TokenCounter;
//!
//! let tokenizer = Tokenizer::from_file("tokenizer.json")?;
//! println!("{} tokens", tokenizer.count("Привіт, світе!"));
//!
//! // Falls back to the heuristic when the file is missing.
//! let counter = counter_from_path(Some("tokenizer.json".as_ref()));
//! ```

use std::path::{Path, PathBuf};

use dialog_core::TokenCounter;
use thiserror::Error;
use tracing::{instrument, warn};

/// Margin added to the character count by [`HeuristicCounter::default`].
pub const DEFAULT_HEURISTIC_MARGIN: usize = 32;

/// Tokenizer loading errors.
#[derive(Error, Debug)]
pub enum TokenizerError {
    /// The tokenizer file could not be read or parsed.
    #[error("failed to load tokenizer from {path}: {message}")]
    Load { path: PathBuf, message: String },

    /// The tokenizer JSON is malformed.
    #[error("invalid tokenizer JSON: {0}")]
    InvalidJson(String),
}

/// Exact token counter backed by a HuggingFace tokenizer.
#[derive(Debug)]
pub struct Tokenizer {
    inner: tokenizers::Tokenizer,
    fallback: HeuristicCounter,
}

impl Tokenizer {
    /// Load a tokenizer from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TokenizerError> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| TokenizerError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self::from_inner(inner))
    }

    /// Create a tokenizer from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, TokenizerError> {
        let inner = tokenizers::Tokenizer::from_bytes(json.as_bytes())
            .map_err(|e| TokenizerError::InvalidJson(e.to_string()))?;

        Ok(Self::from_inner(inner))
    }

    fn from_inner(inner: tokenizers::Tokenizer) -> Self {
        Self {
            inner,
            fallback: HeuristicCounter::default(),
        }
    }

    /// Token ids for `text`, special tokens included.
    pub fn encode_ids(&self, text: &str) -> Option<Vec<u32>> {
        self.inner
            .encode(text, true)
            .ok()
            .map(|encoding| encoding.get_ids().to_vec())
    }

    /// Vocabulary size including added tokens.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    /// Get the underlying tokenizers::Tokenizer.
    pub fn inner(&self) -> &tokenizers::Tokenizer {
        &self.inner
    }
}

impl TokenCounter for Tokenizer {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    fn count(&self, text: &str) -> usize {
        match self.inner.encode(text, true) {
            Ok(encoding) => encoding.len(),
            Err(e) => {
                warn!(error = %e, "Tokenizer failed, using heuristic count");
                self.fallback.count(text)
            }
        }
    }

    fn name(&self) -> &str {
        "tokenizer"
    }
}

/// Conservative length estimate: one token per character plus a fixed
/// margin for special tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeuristicCounter {
    margin: usize,
}

impl Default for HeuristicCounter {
    fn default() -> Self {
        Self::new(DEFAULT_HEURISTIC_MARGIN)
    }
}

impl HeuristicCounter {
    /// Create a heuristic counter with the given margin.
    pub fn new(margin: usize) -> Self {
        Self { margin }
    }

    /// The fixed margin.
    pub fn margin(&self) -> usize {
        self.margin
    }
}

impl TokenCounter for HeuristicCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count() + self.margin
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// Pick a token counter: the tokenizer at `path` if it loads, else the
/// heuristic.
pub fn counter_from_path(path: Option<&Path>) -> Box<dyn TokenCounter> {
    let Some(path) = path else {
        warn!("No tokenizer configured, chunk sizing uses the character heuristic");
        return Box::new(HeuristicCounter::default());
    };

    match Tokenizer::from_file(path) {
        Ok(tokenizer) => Box::new(tokenizer),
        Err(e) => {
            warn!(error = %e, "Tokenizer unavailable, chunk sizing uses the character heuristic");
            Box::new(HeuristicCounter::default())
        }
    }
}
