//! Structured logging setup with tracing.

use dialog_core::LoggingConfig;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logging format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text format.
    #[default]
    Text,
    /// JSON lines, one event per line.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}")),
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, overrides `level`. Calling this twice is harmless;
/// the second call is ignored.
///
/// # Example
/// ```ignore
/// use runtime::logging::{init_logging, LogFormat};
/// init_logging("info", LogFormat::Text);
/// ```
pub fn init_logging(level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Text => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false).compact());

            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true),
            );

            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    }
}

/// Install the global subscriber from a [`LoggingConfig`].
pub fn init_logging_from_config(config: &LoggingConfig) {
    let format = config.format.parse().unwrap_or_default();
    init_logging(&config.level, format);
}

/// Initialize logging from environment variables.
///
/// Uses:
/// - `RUST_LOG` for log level (default: "info")
/// - `LOG_FORMAT` for format (default: "text")
pub fn init_logging_from_env() {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let format: LogFormat = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();

    init_logging(&level, format);
}
