//! Progress tracking and ETA estimation for a batch run.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use dialog_core::{ProgressSnapshot, RunState};

/// Shown until the first part completes.
pub const CALCULATING: &str = "calculating...";

/// Format seconds as `HH:MM:SS`.
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Human-readable time left.
pub fn remaining_text(remaining: Option<Duration>) -> String {
    match remaining {
        None => CALCULATING.to_string(),
        Some(d) => {
            let secs = d.as_secs();
            format!("{} min {} sec remaining", secs / 60, secs % 60)
        }
    }
}

/// Rolling timing of completed parts.
///
/// The estimate is `average part time × parts left`, minus the time already
/// spent on the part in flight.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    started: Instant,
    total: usize,
    durations: Vec<Duration>,
    in_flight_since: Option<Instant>,
    last_artifact: Option<PathBuf>,
}

impl ProgressTracker {
    /// Start tracking a run of `total` parts.
    pub fn new(total: usize) -> Self {
        Self {
            started: Instant::now(),
            total,
            durations: Vec::with_capacity(total),
            in_flight_since: None,
            last_artifact: None,
        }
    }

    /// Mark the start of the next part.
    pub fn begin_part(&mut self) {
        self.in_flight_since = Some(Instant::now());
    }

    /// Record a completed part and the artifact it produced.
    pub fn complete_part(&mut self, artifact: PathBuf) -> Duration {
        let took = self
            .in_flight_since
            .take()
            .map(|t| t.elapsed())
            .unwrap_or_default();
        self.record(took);
        self.last_artifact = Some(artifact);
        took
    }

    /// Record the duration of a completed part.
    pub fn record(&mut self, took: Duration) {
        self.durations.push(took);
    }

    /// Number of completed parts.
    pub fn completed(&self) -> usize {
        self.durations.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Mean duration of completed parts.
    pub fn average(&self) -> Option<Duration> {
        if self.durations.is_empty() {
            return None;
        }
        let sum: Duration = self.durations.iter().sum();
        Some(sum / self.durations.len() as u32)
    }

    /// Estimated time left, `None` before the first completion.
    pub fn remaining(&self) -> Option<Duration> {
        let avg = self.average()?;
        let left = self.total.saturating_sub(self.completed()) as u32;
        let spent = self.in_flight_since.map(|t| t.elapsed()).unwrap_or_default();
        Some((avg * left).saturating_sub(spent))
    }

    /// Snapshot of the run in `state`.
    pub fn snapshot(&self, state: RunState) -> ProgressSnapshot {
        let (remaining, text) = if state.is_terminal() {
            (
                Some(Duration::ZERO),
                format!("finished in {}", format_hms(self.elapsed())),
            )
        } else {
            let remaining = self.remaining();
            (remaining, remaining_text(remaining))
        };

        let eta = remaining
            .filter(|_| !state.is_terminal())
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Local::now() + d);

        ProgressSnapshot {
            state,
            completed_index: self.completed(),
            total: self.total,
            elapsed: self.elapsed(),
            last_artifact_path: self.last_artifact.clone(),
            eta,
            remaining,
            remaining_text: text,
        }
    }
}
