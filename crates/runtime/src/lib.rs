//! # runtime
//!
//! Batch execution of dialogue events.
//!
//! This crate provides:
//! - The batch pipeline: one job at a time on a blocking worker, with
//!   progress snapshots streamed back to the caller
//! - Progress tracking and ETA estimation
//! - Overflow retry when the backend rejects an over-long input
//! - Structured logging and metrics
//! - A deterministic mock synthesis backend
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use runtime::{BatchPipeline, MockBackend};
//!
//! let pipeline = BatchPipeline::new(Arc::new(MockBackend::default()), sfx, chunker, config);
//! let mut run = pipeline.run(events, &speakers);
//! while let Some(snapshot) = run.next().await {
//!     println!("{}", snapshot?.remaining_text);
//! }
//! ```

pub mod backend;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod progress;

pub use backend::MockBackend;
pub use logging::{LogFormat, init_logging, init_logging_from_config, init_logging_from_env};
pub use metrics::{PartKind, PipelineMetrics};
pub use pipeline::{
    BatchPipeline, Canceller, PRE_SPLIT_TOKENS, RETRY_TOKENS, RunHandle, RunSummary,
    audio_artifact_name, pre_split_budget, text_artifact_name,
};
pub use progress::{CALCULATING, ProgressTracker, format_hms, remaining_text};
