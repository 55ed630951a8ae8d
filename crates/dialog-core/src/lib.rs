//! # dialog-core
//!
//! Core types, traits, and error definitions for the dialogue synthesis
//! pipeline.
//!
//! This crate provides the foundational abstractions used across all other
//! crates in the workspace, including:
//!
//! - Common data types (`NormalizedText`, `Chunk`, `Event`, `ProgressSnapshot`)
//! - Trait definitions for pipeline components and the synthesis backend
//! - The error taxonomy (`ParseError`, `SfxError`, `PipelineError`, ...)
//! - Configuration structures and the speaker settings file format
//! - Speed resolution for voice events

pub mod config;
pub mod error;
pub mod speakers;
pub mod speed;
pub mod traits;
pub mod types;

pub use config::{
    DEFAULT_MAX_SPEAKERS, DEFAULT_MAX_TOKENS, LoggingConfig, MetricsConfig, PipelineConfig,
    SfxAsset, SfxConfig,
};
pub use error::{
    ConfigError, ParseError, PipelineError, PipelineResult, SettingsError, SfxError,
    SynthesisError,
};
pub use speakers::{SpeakerSlot, SpeakerTable};
pub use traits::{SynthesisBackend, TextNormalizer, TokenCounter};
pub use types::{
    AudioBuffer, Chunk, Event, NormalizedText, ProgressSnapshot, RunState, SfxEvent, SpeedSuffix,
    SynthesisRequest, VoiceEvent,
};
