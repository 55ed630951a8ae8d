//! Run command implementation: parse a script and execute the batch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use audio_sfx::SfxProcessor;
use chrono::Local;
use dialog_core::PipelineConfig;
use futures::StreamExt;
use runtime::{BatchPipeline, MockBackend, PipelineMetrics, format_hms};
use script_parser::ScriptParser;
use text_chunker::Chunker;
use tracing::{info, warn};

use super::{load_sfx_config, load_speakers, read_input};

/// Options for the run command.
#[derive(Debug)]
pub struct RunOptions {
    pub input: String,
    pub output: PathBuf,
    pub speakers: Option<PathBuf>,
    pub sfx_config: Option<PathBuf>,
    pub tokenizer: Option<PathBuf>,
    pub max_tokens: usize,
    pub max_speakers: usize,
    pub save_text: bool,
    pub ignore_speed: bool,
    pub metrics_port: Option<u16>,
}

/// Directory for one run: `<output>/<YYYYmmdd_HHMMSS>`.
pub fn session_dir(output: &std::path::Path) -> PathBuf {
    output.join(Local::now().format("%Y%m%d_%H%M%S").to_string())
}

/// Run the run command.
pub async fn run(options: RunOptions) -> Result<()> {
    let start = Instant::now();

    let script = read_input(&options.input)?;
    let sfx = load_sfx_config(options.sfx_config.as_deref())?;
    let speakers = load_speakers(options.speakers.as_deref(), options.max_speakers)?;
    let chunker = Arc::new(Chunker::new(text_tokenizer::counter_from_path(
        options.tokenizer.as_deref(),
    )));

    let events = ScriptParser::new(Arc::clone(&chunker))
        .with_sfx_config(&sfx)
        .with_max_speakers(options.max_speakers)
        .with_max_tokens(options.max_tokens)
        .parse_str(&script, &speakers.voices())
        .context("script is not valid")?;

    let metrics = match options.metrics_port {
        Some(port) => PipelineMetrics::init(port).context("cannot start metrics exporter")?,
        None => PipelineMetrics::noop(),
    };

    let output_dir = session_dir(&options.output);
    let config = PipelineConfig {
        max_tokens: options.max_tokens,
        max_speakers: options.max_speakers,
        ..PipelineConfig::default()
    }
    .with_output_dir(&output_dir)
    .with_save_text(options.save_text)
    .with_ignore_speed(options.ignore_speed);

    let mut processor = SfxProcessor::new(sfx);
    if let Some(dir) = options
        .input
        .strip_prefix('@')
        .and_then(|p| std::path::Path::new(p).parent())
    {
        processor = processor.with_search_dir(dir);
    }

    info!(
        events = events.len(),
        output = %output_dir.display(),
        "Starting batch run"
    );

    let pipeline = BatchPipeline::new(Arc::new(MockBackend::default()), processor, chunker, config)
        .with_metrics(metrics);
    let mut handle = pipeline.run(events, &speakers);

    let mut last_artifact = None;
    while let Some(item) = handle.next().await {
        let snapshot = match item {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Run aborted");
                return Err(e).context("batch run failed");
            }
        };

        if snapshot.last_artifact_path != last_artifact {
            if let Some(path) = &snapshot.last_artifact_path {
                println!("  wrote {}", path.display());
            }
            last_artifact = snapshot.last_artifact_path.clone();
        }
        println!(
            "[{}/{}] {} elapsed | {}",
            snapshot.completed_index,
            snapshot.total,
            format_hms(snapshot.elapsed),
            snapshot.remaining_text
        );
    }

    let summary = handle.finish().await.context("batch run failed")?;
    println!();
    println!("State:     {:?}", summary.state);
    println!("Parts:     {}/{}", summary.completed, summary.total);
    println!("Output:    {}", output_dir.display());
    println!("Total:     {}", format_hms(start.elapsed()));
    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for w in &summary.warnings {
            println!("  {w}");
        }
    }

    Ok(())
}
