//! Metrics collection and Prometheus export.

use std::net::SocketAddr;

use dialog_core::{ConfigError, PipelineError, PipelineResult};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Kind label of a completed part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Voice,
    Sfx,
}

impl PartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Sfx => "sfx",
        }
    }
}

/// Metrics recorder for batch runs.
///
/// Without an installed recorder every call is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Install the Prometheus exporter and describe the metrics.
    ///
    /// # Arguments
    /// * `port` - Port for the `/metrics` endpoint
    pub fn init(port: u16) -> PipelineResult<Self> {
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();

        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| {
                PipelineError::Config(ConfigError::Invalid(format!("metrics init failed: {e}")))
            })?;

        Self::register_metrics();
        Ok(Self)
    }

    /// A recorder that reports to whatever global recorder exists, if any.
    pub fn noop() -> Self {
        Self
    }

    fn register_metrics() {
        describe_counter!("dialog_runs_total", "Batch runs started");
        describe_counter!(
            "dialog_parts_completed_total",
            "Parts written, labelled by kind"
        );
        describe_counter!("dialog_parts_failed_total", "Parts that aborted a run");
        describe_counter!(
            "dialog_overflow_retries_total",
            "Voice parts re-split after the backend reported an over-long input"
        );
        describe_histogram!(
            "dialog_part_duration_ms",
            "Wall time per part, synthesis and artifact writing included"
        );
        describe_gauge!("dialog_run_progress", "Completed fraction of the current run");
    }

    pub fn run_started(&self) {
        counter!("dialog_runs_total").increment(1);
    }

    pub fn part_completed(&self, kind: PartKind, ms: f64) {
        counter!("dialog_parts_completed_total", "kind" => kind.as_str()).increment(1);
        histogram!("dialog_part_duration_ms", "kind" => kind.as_str()).record(ms);
    }

    pub fn part_failed(&self) {
        counter!("dialog_parts_failed_total").increment(1);
    }

    pub fn overflow_retry(&self) {
        counter!("dialog_overflow_retries_total").increment(1);
    }

    pub fn set_progress(&self, fraction: f64) {
        gauge!("dialog_run_progress").set(fraction);
    }
}
