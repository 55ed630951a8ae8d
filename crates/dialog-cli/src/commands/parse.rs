//! Parse command implementation (dry run).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use dialog_core::{Event, speed};
use script_parser::ScriptParser;
use text_chunker::Chunker;

use super::{load_sfx_config, load_speakers, read_input};

/// Options for the parse command.
#[derive(Debug)]
pub struct ParseOptions {
    pub input: String,
    pub speakers: Option<PathBuf>,
    pub sfx_config: Option<PathBuf>,
    pub tokenizer: Option<PathBuf>,
    pub max_tokens: usize,
    pub max_speakers: usize,
    pub ignore_speed: bool,
    pub json: bool,
}

/// Run the parse command.
pub fn run(options: ParseOptions) -> Result<()> {
    let script = read_input(&options.input)?;
    let sfx = load_sfx_config(options.sfx_config.as_deref())?;
    let speakers = load_speakers(options.speakers.as_deref(), options.max_speakers)?;
    let chunker = Arc::new(Chunker::new(text_tokenizer::counter_from_path(
        options.tokenizer.as_deref(),
    )));

    let parser = ScriptParser::new(chunker)
        .with_sfx_config(&sfx)
        .with_max_speakers(options.max_speakers)
        .with_max_tokens(options.max_tokens);
    let events = parser
        .parse_str(&script, &speakers.voices())
        .context("script is not valid")?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    let used: Vec<String> = parser
        .speakers_used(&script)
        .into_iter()
        .map(|n| format!("#g{n}"))
        .collect();
    println!("{} event(s), speakers: {}", events.len(), used.join(" "));

    let speeds = speakers.speeds();
    for (i, event) in events.iter().enumerate() {
        match event {
            Event::Voice(v) => {
                let speed = speed::resolve(
                    v.slot,
                    v.suffix,
                    &speeds,
                    options.ignore_speed,
                    sfx.default_speed,
                );
                println!(
                    "[{:03}] line {:>4}  voice #g{} ({}) speed {:.2}: {}",
                    i + 1,
                    v.line,
                    v.slot,
                    speakers.voice(v.slot).unwrap_or("-"),
                    speed,
                    v.text
                );
            }
            Event::Sfx(s) => {
                println!("[{:03}] line {:>4}  sfx   #{}", i + 1, s.line, s.id);
            }
        }
    }

    Ok(())
}
