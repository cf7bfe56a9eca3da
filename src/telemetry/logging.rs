//! Logging configuration and initialization.
//!
//! The level comes from RUST_LOG when set, otherwise from the `[logging]`
//! section of the config file. Output is pretty, compact or json.

use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// `[logging]` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// error, warn, info, debug or trace
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Installs the global subscriber.
///
/// Priority:
/// 1. RUST_LOG environment variable (if set)
/// 2. config parameter (if provided)
/// 3. Default: info level, pretty format
///
/// Calling it twice is harmless; the second subscriber is discarded.
pub fn init_logging(config: Option<&LogConfig>) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if let Some(cfg) = config {
        EnvFilter::new(parse_level(&cfg.level).as_str())
    } else {
        EnvFilter::new("info")
    };

    let format = config.map(|c| c.format).unwrap_or_default();

    match format {
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE),
            );
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact());
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer());
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    }
}

/// Unknown names fall back to info.
pub(crate) fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}
