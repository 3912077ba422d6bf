//! Logging initialization
//!
//! Configures `tracing-subscriber` from [`LogConfig`]:
//!
//! - `RUST_LOG` takes precedence when set
//! - otherwise `LOG_LEVEL` applies to this crate and `info` to dependencies
//! - `LOG_TO` selects stdout or a log file
//! - `LOG_FORMAT` selects text or JSON lines

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};
use crate::error::{ConfigError, PucaError, Result};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Known level name, or `None`
pub fn normalize_level(level: &str) -> Option<&'static str> {
    let level = level.trim().to_lowercase();
    LEVELS.iter().copied().find(|l| *l == level)
}

/// Filter directives used when `RUST_LOG` is unset
pub fn default_directives(level: &str) -> String {
    let level = normalize_level(level).unwrap_or("info");
    format!("info,{}={}", env!("CARGO_CRATE_NAME"), level)
}

/// Install the global subscriber.
///
/// `keep_stdout_clean` redirects "stdout" output to stderr, for the stdio
/// transport where stdout carries protocol messages.
pub fn init_logging(config: &LogConfig, keep_stdout_clean: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    let to_file = config.output != "stdout";
    let writer = if to_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.output)?;
        BoxMakeWriter::new(Mutex::new(file))
    } else if keep_stdout_clean {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(!to_file);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|e| {
        PucaError::Config(ConfigError::InvalidConfig {
            message: format!("failed to initialize logging: {}", e),
        })
    })?;

    if normalize_level(&config.level).is_none() {
        tracing::warn!(level = %config.level, "Invalid log level, using info instead");
    }
    Ok(())
}
