//! Trait definitions for pipeline components.

use crate::error::SynthesisError;
use crate::types::{AudioBuffer, NormalizedText, SynthesisRequest};

/// Text normalization trait.
///
/// Implementations canonicalize raw input so that downstream chunking and
/// synthesis see a single representation of quotes, dashes and whitespace.
/// Normalization is total: every input string has a normalized form.
pub trait TextNormalizer: Send + Sync {
    /// Normalize the input text.
    fn normalize(&self, input: &str) -> NormalizedText;
}

/// Token length estimation.
///
/// Chunk sizing depends on this never under-estimating what the synthesis
/// encoder will see; over-estimating only costs smaller chunks.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens `text` encodes to, special tokens included.
    fn count(&self, text: &str) -> usize;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// The neural synthesis backend, consumed as an opaque call.
///
/// Implementations may block for a long time (GPU inference); the pipeline
/// calls them from a dedicated worker, one request at a time.
pub trait SynthesisBackend: Send + Sync {
    /// Synthesize one piece of text.
    ///
    /// Returns [`SynthesisError::InputTooLong`] when the text exceeds the
    /// encoder's hard input limit.
    fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer, SynthesisError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "backend"
    }
}

impl<T: TokenCounter + ?Sized> TokenCounter for Box<T> {
    fn count(&self, text: &str) -> usize {
        (**self).count(text)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: TokenCounter + ?Sized> TokenCounter for std::sync::Arc<T> {
    fn count(&self, text: &str) -> usize {
        (**self).count(text)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
