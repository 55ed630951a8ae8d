//! Batch pipeline - executes dialogue events one at a time.
//!
//! Each event becomes a job on a blocking worker. A snapshot is emitted when
//! the job is submitted and again at every poll interval while it runs; when
//! it finishes, the artifact is written and a snapshot carrying its path is
//! emitted. Snapshots travel over a channel to the [`RunHandle`].

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use audio_sfx::{SfxProcessor, write_wav_samples};
use dialog_core::{
    AudioBuffer, Chunk, Event, NormalizedText, ParseError, PipelineConfig, PipelineError,
    PipelineResult, ProgressSnapshot, RunState, SpeakerTable, SynthesisBackend, SynthesisError,
    SynthesisRequest, speed,
};
use futures::{Stream, StreamExt};
use text_chunker::{CHAR_CAP, Chunker, HARD_MAX_TOKENS, TOKEN_SAFETY};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::metrics::{PartKind, PipelineMetrics};
use crate::progress::{ProgressTracker, format_hms};

/// Budget for voice text that is too long to send as-is, at the default
/// token budget.
pub const PRE_SPLIT_TOKENS: usize = pre_split_budget(HARD_MAX_TOKENS);

/// Budget for the single retry after the backend rejected an input.
pub const RETRY_TOKENS: usize = TOKEN_SAFETY / 3;

const CHANNEL_CAPACITY: usize = 32;

/// Pre-split budget for a configured `max_tokens`: never above half of
/// [`TOKEN_SAFETY`].
pub const fn pre_split_budget(max_tokens: usize) -> usize {
    if max_tokens < TOKEN_SAFETY / 2 {
        max_tokens
    } else {
        TOKEN_SAFETY / 2
    }
}

/// File name of the audio artifact for a 1-based event index.
pub fn audio_artifact_name(index: usize) -> String {
    format!("part_{index:03}.wav")
}

/// File name of the text artifact for a 1-based event index.
pub fn text_artifact_name(index: usize) -> String {
    format!("part_{index:03}.txt")
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Final state.
    pub state: RunState,
    /// Number of events whose artifacts were written.
    pub completed: usize,
    /// Number of events in the run.
    pub total: usize,
    /// Audio artifacts, in event order.
    pub artifacts: Vec<PathBuf>,
    /// Non-fatal anomalies seen during the run.
    pub warnings: Vec<String>,
    /// Wall time of the run.
    pub elapsed: Duration,
}

/// Executes parsed events against a synthesis backend and the SFX processor.
#[derive(Clone)]
pub struct BatchPipeline {
    backend: Arc<dyn SynthesisBackend>,
    sfx: Arc<SfxProcessor>,
    chunker: Arc<Chunker>,
    config: PipelineConfig,
    metrics: PipelineMetrics,
}

impl std::fmt::Debug for BatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPipeline")
            .field("backend", &self.backend.name())
            .field("chunker", &self.chunker)
            .field("config", &self.config)
            .finish()
    }
}

impl BatchPipeline {
    /// Create a pipeline.
    pub fn new(
        backend: Arc<dyn SynthesisBackend>,
        sfx: SfxProcessor,
        chunker: Arc<Chunker>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            backend,
            sfx: Arc::new(sfx),
            chunker,
            config,
            metrics: PipelineMetrics::noop(),
        }
    }

    /// Report through the given metrics recorder.
    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Start a run over `events`.
    ///
    /// Must be called from within a tokio runtime. The run proceeds in the
    /// background; progress arrives through the returned handle.
    #[instrument(skip_all, fields(total = events.len(), output = %self.config.output_dir.display()))]
    pub fn run(&self, events: Vec<Event>, speakers: &SpeakerTable) -> RunHandle {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(RunState::Idle);
        let cancel = Arc::new(AtomicBool::new(false));

        let driver = Driver {
            pipeline: self.clone(),
            voices: speakers.voices(),
            speeds: speakers.speeds(),
            tx,
            state: state_tx,
            cancel: Arc::clone(&cancel),
        };

        let span = info_span!("batch_run", total = events.len());
        let task = tokio::spawn(driver.drive(events).instrument(span));

        RunHandle {
            events: ReceiverStream::new(rx),
            state: state_rx,
            cancel,
            driver: task,
        }
    }
}

/// Requests cancellation of a run from anywhere.
#[derive(Debug, Clone)]
pub struct Canceller(Arc<AtomicBool>);

impl Canceller {
    /// Stop the run before its next event. The event in flight is finished.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle to a running batch.
///
/// Yields progress snapshots as a [`Stream`]. A fatal error arrives as the
/// last item.
#[derive(Debug)]
pub struct RunHandle {
    events: ReceiverStream<PipelineResult<ProgressSnapshot>>,
    state: watch::Receiver<RunState>,
    cancel: Arc<AtomicBool>,
    driver: JoinHandle<RunSummary>,
}

impl RunHandle {
    /// Current state of the run.
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Subscribe to state changes.
    pub fn watch_state(&self) -> watch::Receiver<RunState> {
        self.state.clone()
    }

    /// Stop the run before its next event. The event in flight is finished.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// A cancel switch that outlives borrows of the handle.
    pub fn canceller(&self) -> Canceller {
        Canceller(Arc::clone(&self.cancel))
    }

    /// Drain the remaining snapshots and wait for the run to end.
    pub async fn finish(self) -> PipelineResult<RunSummary> {
        let RunHandle {
            mut events, driver, ..
        } = self;

        let mut failure = None;
        while let Some(item) = events.next().await {
            if let Err(e) = item {
                failure.get_or_insert(e);
            }
        }

        let summary = driver.await.map_err(|e| PipelineError::Worker {
            index: 0,
            message: e.to_string(),
        })?;

        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

impl Stream for RunHandle {
    type Item = PipelineResult<ProgressSnapshot>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().events).poll_next(cx)
    }
}

/// Owns the state of one run.
struct Driver {
    pipeline: BatchPipeline,
    voices: Vec<Option<String>>,
    speeds: Vec<f32>,
    tx: mpsc::Sender<PipelineResult<ProgressSnapshot>>,
    state: watch::Sender<RunState>,
    cancel: Arc<AtomicBool>,
}

impl Driver {
    async fn drive(self, events: Vec<Event>) -> RunSummary {
        let total = events.len();
        let mut tracker = ProgressTracker::new(total);
        let mut artifacts = Vec::with_capacity(total);
        let mut warnings = Vec::new();
        let metrics = self.pipeline.metrics;
        let output_dir = self.pipeline.config.output_dir.clone();

        info!(
            total,
            backend = self.pipeline.backend.name(),
            "Batch run started"
        );
        metrics.run_started();

        if let Err(e) = self.check_slots(&events) {
            return self.fail(e, &tracker, artifacts, warnings).await;
        }

        if let Err(e) = std::fs::create_dir_all(&output_dir) {
            return self
                .fail(PipelineError::Io(e), &tracker, artifacts, warnings)
                .await;
        }

        let pre_split_tokens = pre_split_budget(self.pipeline.config.max_tokens);
        // Fixed by the first voice part; SFX are converted to it.
        let mut base_rate: Option<u32> = None;
        let mut outcome = RunState::Completed;

        for (i, event) in events.into_iter().enumerate() {
            let index = i + 1;

            if self.cancel.load(Ordering::SeqCst) {
                info!(index, total, "Run cancelled before next part");
                outcome = RunState::Cancelled;
                break;
            }

            let running = RunState::Running { index, total };
            self.state.send_replace(running);

            let job = self.prepare(index, event, base_rate, &mut warnings);
            let kind = job.kind();
            let ctx = JobContext {
                backend: Arc::clone(&self.pipeline.backend),
                sfx: Arc::clone(&self.pipeline.sfx),
                chunker: Arc::clone(&self.pipeline.chunker),
                output_dir: output_dir.clone(),
                save_text: self.pipeline.config.save_text,
                pre_split_tokens,
                metrics,
            };

            tracker.begin_part();
            let result = self.await_job(index, job, ctx, &tracker, running).await;

            let output = match result {
                Ok(output) => output,
                Err(e) => {
                    metrics.part_failed();
                    return self.fail(e, &tracker, artifacts, warnings).await;
                }
            };

            if output.retried {
                warnings.push(format!(
                    "part {index}: input too long, re-split into {} pieces",
                    output.pieces
                ));
            }
            if kind == PartKind::Voice {
                base_rate.get_or_insert(output.sample_rate);
            }

            let took = tracker.complete_part(output.audio_path.clone());
            metrics.part_completed(kind, took.as_secs_f64() * 1000.0);
            metrics.set_progress(index as f64 / total as f64);
            artifacts.push(output.audio_path);

            if !self.emit(Ok(tracker.snapshot(running))).await {
                debug!(index, "Progress receiver dropped, stopping run");
                outcome = RunState::Cancelled;
                break;
            }
        }

        self.state.send_replace(outcome);
        let _ = self.emit(Ok(tracker.snapshot(outcome))).await;

        info!(
            state = ?outcome,
            completed = tracker.completed(),
            total,
            elapsed = %format_hms(tracker.elapsed()),
            "Batch run finished"
        );
        log_warnings(&warnings);

        RunSummary {
            state: outcome,
            completed: tracker.completed(),
            total,
            artifacts,
            warnings,
            elapsed: tracker.elapsed(),
        }
    }

    /// Reject voice events addressing a slot outside `1..=max_speakers`.
    ///
    /// Runs before anything is written so a bad event list leaves no
    /// partial output behind.
    fn check_slots(&self, events: &[Event]) -> PipelineResult<()> {
        let max = self.pipeline.config.max_speakers;
        let out_of_range = events.iter().find_map(|event| match event {
            Event::Voice(voice) if voice.slot == 0 || voice.slot > max => Some(voice),
            _ => None,
        });

        match out_of_range {
            Some(voice) => Err(ParseError::SpeakerOutOfRange {
                line: voice.line,
                n: voice.slot,
                max,
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Turn an event into a job, resolving speed and voice.
    fn prepare(
        &self,
        index: usize,
        event: Event,
        base_rate: Option<u32>,
        warnings: &mut Vec<String>,
    ) -> Job {
        let sfx_config = self.pipeline.sfx.config();

        match event {
            Event::Voice(voice) => {
                let speed = speed::resolve(
                    voice.slot,
                    voice.suffix,
                    &self.speeds,
                    self.pipeline.config.ignore_speed,
                    sfx_config.default_speed,
                );
                if !self.pipeline.config.ignore_speed && speed::is_out_of_slider_range(speed) {
                    warn!(index, slot = voice.slot, speed, "Speed outside slider range");
                    warnings.push(format!(
                        "part {index}: speed {speed:.2} for #g{} is outside the slider range",
                        voice.slot
                    ));
                }

                let voice_id = voice
                    .slot
                    .checked_sub(1)
                    .and_then(|i| self.voices.get(i))
                    .cloned()
                    .flatten();
                if voice_id.is_none() {
                    warn!(index, slot = voice.slot, "No voice assigned to speaker");
                    warnings.push(format!("part {index}: no voice for #g{}", voice.slot));
                }

                let request = SynthesisRequest::new(voice.text.as_str())
                    .with_slot(voice.slot)
                    .with_speed(speed)
                    .with_voice(voice_id);

                Job::Voice {
                    index,
                    text: voice.text,
                    request,
                }
            }
            Event::Sfx(sfx) => Job::Sfx {
                index,
                id: sfx.id,
                sample_rate: base_rate.unwrap_or(sfx_config.default_sr),
            },
        }
    }

    /// Run a job on the blocking pool, emitting progress until it finishes.
    async fn await_job(
        &self,
        index: usize,
        job: Job,
        ctx: JobContext,
        tracker: &ProgressTracker,
        running: RunState,
    ) -> PipelineResult<JobOutput> {
        let poll = self.pipeline.config.poll_interval();
        let mut ticker = interval_at(tokio::time::Instant::now() + poll, poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Every part reports once on submission, however fast it finishes.
        let _ = self.emit(Ok(tracker.snapshot(running))).await;

        let mut handle = tokio::task::spawn_blocking(move || job.execute(&ctx));

        loop {
            tokio::select! {
                joined = &mut handle => {
                    return joined.unwrap_or_else(|e| Err(PipelineError::Worker {
                        index,
                        message: e.to_string(),
                    }));
                }
                _ = ticker.tick() => {
                    // A dropped receiver only matters between jobs.
                    let _ = self.emit(Ok(tracker.snapshot(running))).await;
                }
            }
        }
    }

    async fn emit(&self, item: PipelineResult<ProgressSnapshot>) -> bool {
        self.tx.send(item).await.is_ok()
    }

    async fn fail(
        &self,
        error: PipelineError,
        tracker: &ProgressTracker,
        artifacts: Vec<PathBuf>,
        warnings: Vec<String>,
    ) -> RunSummary {
        warn!(error = %error, completed = tracker.completed(), "Batch run failed");
        self.state.send_replace(RunState::Failed);
        let _ = self.emit(Err(error)).await;
        log_warnings(&warnings);

        RunSummary {
            state: RunState::Failed,
            completed: tracker.completed(),
            total: tracker.total(),
            artifacts,
            warnings,
            elapsed: tracker.elapsed(),
        }
    }
}

fn log_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    warn!(count = warnings.len(), "Run finished with warnings");
    for w in warnings {
        warn!("  {w}");
    }
}

/// Everything a job needs on the worker thread.
struct JobContext {
    backend: Arc<dyn SynthesisBackend>,
    sfx: Arc<SfxProcessor>,
    chunker: Arc<Chunker>,
    output_dir: PathBuf,
    save_text: bool,
    pre_split_tokens: usize,
    metrics: PipelineMetrics,
}

enum Job {
    Voice {
        index: usize,
        text: Chunk,
        request: SynthesisRequest,
    },
    Sfx {
        index: usize,
        id: String,
        sample_rate: u32,
    },
}

#[derive(Debug)]
struct JobOutput {
    audio_path: PathBuf,
    sample_rate: u32,
    retried: bool,
    pieces: usize,
}

impl Job {
    fn kind(&self) -> PartKind {
        match self {
            Job::Voice { .. } => PartKind::Voice,
            Job::Sfx { .. } => PartKind::Sfx,
        }
    }

    fn execute(self, ctx: &JobContext) -> PipelineResult<JobOutput> {
        let started = Instant::now();

        match self {
            Job::Voice {
                index,
                text,
                request,
            } => {
                let (audio, pieces, retried) = synthesize_voice(ctx, index, &text, &request)?;
                let audio_path = ctx.output_dir.join(audio_artifact_name(index));
                write_audio(index, &audio_path, &audio)?;

                if ctx.save_text {
                    let text_path = ctx.output_dir.join(text_artifact_name(index));
                    std::fs::write(&text_path, text.as_str()).map_err(|e| {
                        PipelineError::Artifact {
                            index,
                            path: text_path.clone(),
                            message: e.to_string(),
                        }
                    })?;
                }

                info!(
                    index,
                    kind = "voice",
                    slot = request.slot,
                    voice = request.voice.as_deref().unwrap_or("-"),
                    speed = request.speed,
                    chars = text.char_len(),
                    pieces,
                    audio_ms = audio.duration_ms(),
                    took_ms = started.elapsed().as_millis() as u64,
                    path = %audio_path.display(),
                    "Part completed"
                );

                Ok(JobOutput {
                    audio_path,
                    sample_rate: audio.sample_rate,
                    retried,
                    pieces,
                })
            }
            Job::Sfx {
                index,
                id,
                sample_rate,
            } => {
                let audio = ctx.sfx.load_and_process(&id, sample_rate).map_err(|source| {
                    PipelineError::Asset {
                        index,
                        id: id.clone(),
                        source,
                    }
                })?;
                let audio_path = ctx.output_dir.join(audio_artifact_name(index));
                write_audio(index, &audio_path, &audio)?;

                info!(
                    index,
                    kind = "sfx",
                    id = %id,
                    sample_rate,
                    audio_ms = audio.duration_ms(),
                    took_ms = started.elapsed().as_millis() as u64,
                    path = %audio_path.display(),
                    "Part completed"
                );

                Ok(JobOutput {
                    audio_path,
                    sample_rate,
                    retried: false,
                    pieces: 1,
                })
            }
        }
    }
}

/// Synthesize one voice event, splitting further when the text is too long.
///
/// Returns the audio, the number of backend calls it took and whether the
/// overflow retry was used.
fn synthesize_voice(
    ctx: &JobContext,
    index: usize,
    text: &Chunk,
    request: &SynthesisRequest,
) -> PipelineResult<(AudioBuffer, usize, bool)> {
    let chunker = &ctx.chunker;
    let oversized =
        chunker.count_tokens(text.as_str()) > TOKEN_SAFETY || text.char_len() > CHAR_CAP;

    let pieces = if oversized {
        debug!(index, budget = ctx.pre_split_tokens, "Pre-splitting oversized voice text");
        split_at(chunker, text, ctx.pre_split_tokens)
    } else {
        vec![text.clone()]
    };

    match synthesize_pieces(ctx.backend.as_ref(), request, &pieces) {
        Ok(audio) => Ok((audio, pieces.len(), false)),
        Err(e) if e.is_overflow() => {
            let budget = RETRY_TOKENS.min(ctx.pre_split_tokens);
            warn!(index, error = %e, budget, "Backend rejected input, re-splitting once");
            ctx.metrics.overflow_retry();

            let pieces = split_at(chunker, text, budget);
            synthesize_pieces(ctx.backend.as_ref(), request, &pieces)
                .map(|audio| (audio, pieces.len(), true))
                .map_err(|source| {
                    if source.is_overflow() {
                        PipelineError::SynthesisOverflow { index, source }
                    } else {
                        PipelineError::Synthesis { index, source }
                    }
                })
        }
        Err(source) => Err(PipelineError::Synthesis { index, source }),
    }
}

fn split_at(chunker: &Chunker, text: &Chunk, budget: usize) -> Vec<Chunk> {
    chunker.split(&NormalizedText::new(text.as_str()), budget)
}

/// Synthesize each piece in order and concatenate the audio.
fn synthesize_pieces(
    backend: &dyn SynthesisBackend,
    template: &SynthesisRequest,
    pieces: &[Chunk],
) -> Result<AudioBuffer, SynthesisError> {
    let mut combined: Option<AudioBuffer> = None;

    for piece in pieces {
        let request = SynthesisRequest {
            text: piece.as_str().to_string(),
            ..template.clone()
        };
        let audio = backend.synthesize(&request)?;

        match combined.as_mut() {
            Some(all) if all.sample_rate != audio.sample_rate => {
                return Err(SynthesisError::backend(format!(
                    "sample rate changed mid-part: {} then {}",
                    all.sample_rate, audio.sample_rate
                )));
            }
            Some(all) => all.append(audio),
            None => combined = Some(audio),
        }
    }

    combined.ok_or_else(|| SynthesisError::backend("nothing to synthesize"))
}

fn write_audio(index: usize, path: &Path, audio: &AudioBuffer) -> PipelineResult<()> {
    write_wav_samples(path, &audio.samples, audio.sample_rate).map_err(|e| {
        PipelineError::Artifact {
            index,
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })
}
