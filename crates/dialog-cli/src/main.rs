//! Dialogue synthesis command-line interface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dialog_core::{DEFAULT_MAX_SPEAKERS, DEFAULT_MAX_TOKENS};
use std::path::PathBuf;
use tracing::info;

mod commands;

use commands::settings::SlotAssignment;

/// Batch multi-speaker dialogue synthesis
#[derive(Debug, Parser)]
#[command(name = "dialog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Log format (json or text)
    #[arg(long, default_value = "text", global = true)]
    log_format: LogFormatArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Json,
    Text,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a script and synthesize every part
    Run {
        /// Script text or file path (use @script.txt for file input)
        input: String,

        /// Output directory; each run writes into a timestamped subdirectory
        #[arg(short, long, default_value = "output_audio")]
        output: PathBuf,

        /// Speaker settings file
        #[arg(short, long)]
        speakers: Option<PathBuf>,

        /// SFX table (defaults to sfx.yaml or sound/sfx.yaml in the working directory)
        #[arg(long)]
        sfx_config: Option<PathBuf>,

        /// Tokenizer file for exact token counts
        #[arg(short, long)]
        tokenizer: Option<PathBuf>,

        /// Token budget per chunk
        #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
        max_tokens: usize,

        /// Number of speaker slots
        #[arg(long, default_value_t = DEFAULT_MAX_SPEAKERS)]
        max_speakers: usize,

        /// Write part_NNN.txt next to each voice part
        #[arg(long)]
        save_text: bool,

        /// Use the default speed for every voice part
        #[arg(long)]
        ignore_speed: bool,

        /// Serve Prometheus metrics on this port
        #[arg(long)]
        metrics_port: Option<u16>,
    },

    /// Parse a script without synthesis (dry run)
    Parse {
        /// Script text or file path (use @script.txt for file input)
        input: String,

        /// Speaker settings file
        #[arg(short, long)]
        speakers: Option<PathBuf>,

        /// SFX table
        #[arg(long)]
        sfx_config: Option<PathBuf>,

        /// Tokenizer file for exact token counts
        #[arg(short, long)]
        tokenizer: Option<PathBuf>,

        /// Token budget per chunk
        #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
        max_tokens: usize,

        /// Number of speaker slots
        #[arg(long, default_value_t = DEFAULT_MAX_SPEAKERS)]
        max_speakers: usize,

        /// Show resolved speeds as if speed settings were ignored
        #[arg(long)]
        ignore_speed: bool,

        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Normalize text without synthesis (dry run)
    Normalize {
        /// Input text or file path (use @file.txt for file input)
        input: String,
    },

    /// Split text into chunks (dry run)
    Chunk {
        /// Input text or file path (use @file.txt for file input)
        input: String,

        /// Token budget per chunk
        #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
        max_tokens: usize,

        /// Tokenizer file for exact token counts
        #[arg(short, long)]
        tokenizer: Option<PathBuf>,
    },

    /// Export or import speaker settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Show version and limits
    Info,
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// Write a settings file
    Export {
        /// Start from an existing settings file
        #[arg(long)]
        from: Option<PathBuf>,

        /// Slot assignment, N=voice[:speed]; repeatable
        #[arg(long = "set", value_parser = commands::settings::parse_assignment)]
        assignments: Vec<SlotAssignment>,

        /// Directory to write into
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Write speakers_settings.txt instead of a timestamped export
        #[arg(long)]
        default: bool,

        /// Number of speaker slots
        #[arg(long, default_value_t = DEFAULT_MAX_SPEAKERS)]
        max_speakers: usize,
    },

    /// Read a settings file and show the assigned voices
    Import {
        /// Settings file
        file: PathBuf,

        /// Number of speaker slots
        #[arg(long, default_value_t = DEFAULT_MAX_SPEAKERS)]
        max_speakers: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = match cli.log_format {
        LogFormatArg::Json => runtime::logging::LogFormat::Json,
        LogFormatArg::Text => runtime::logging::LogFormat::Text,
    };
    runtime::logging::init_logging(&cli.log_level, format);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting dialog CLI");

    match cli.command {
        Commands::Run {
            input,
            output,
            speakers,
            sfx_config,
            tokenizer,
            max_tokens,
            max_speakers,
            save_text,
            ignore_speed,
            metrics_port,
        } => {
            let options = commands::run::RunOptions {
                input,
                output,
                speakers,
                sfx_config,
                tokenizer,
                max_tokens,
                max_speakers,
                save_text,
                ignore_speed,
                metrics_port,
            };
            commands::run::run(options).await.context("run failed")?;
        }
        Commands::Parse {
            input,
            speakers,
            sfx_config,
            tokenizer,
            max_tokens,
            max_speakers,
            ignore_speed,
            json,
        } => {
            let options = commands::parse::ParseOptions {
                input,
                speakers,
                sfx_config,
                tokenizer,
                max_tokens,
                max_speakers,
                ignore_speed,
                json,
            };
            commands::parse::run(options).context("parse failed")?;
        }
        Commands::Normalize { input } => {
            commands::normalize::run(&input).context("normalization failed")?;
        }
        Commands::Chunk {
            input,
            max_tokens,
            tokenizer,
        } => {
            commands::chunk::run(&input, max_tokens, tokenizer.as_deref())
                .context("chunking failed")?;
        }
        Commands::Settings { action } => match action {
            SettingsAction::Export {
                from,
                assignments,
                dir,
                default,
                max_speakers,
            } => {
                commands::settings::export(
                    from.as_deref(),
                    &assignments,
                    &dir,
                    default,
                    max_speakers,
                )
                .context("settings export failed")?;
            }
            SettingsAction::Import { file, max_speakers } => {
                commands::settings::import(&file, max_speakers)
                    .context("settings import failed")?;
            }
        },
        Commands::Info => {
            commands::info::run();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "dialog",
            "run",
            "@script.txt",
            "--output",
            "out",
            "--save-text",
            "--ignore-speed",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                input,
                output,
                save_text,
                ignore_speed,
                max_tokens,
                ..
            } => {
                assert_eq!(input, "@script.txt");
                assert_eq!(output, PathBuf::from("out"));
                assert!(save_text && ignore_speed);
                assert_eq!(max_tokens, DEFAULT_MAX_TOKENS);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_settings_export() {
        let cli = Cli::try_parse_from([
            "dialog", "settings", "export", "--set", "1=Anna:0,9", "--set", "2=Petro", "--default",
        ])
        .unwrap();

        match cli.command {
            Commands::Settings {
                action:
                    SettingsAction::Export {
                        assignments,
                        default,
                        ..
                    },
            } => {
                assert_eq!(assignments.len(), 2);
                assert_eq!(assignments[1].voice.as_deref(), Some("Petro"));
                assert!(default);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
