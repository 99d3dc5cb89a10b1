//! Tracing subscriber setup
//!
//! Logs always go to stderr or a file. stdout carries command output, and in
//! `mcp` mode the JSON-RPC protocol.

use std::sync::Mutex;

use anyhow::{Context, Result};
use bytebell_config::{LogFormat, LoggingConfig};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::GlobalOptions;

/// Effective level: `--quiet` and `--verbose` win over `[logging] level`
pub fn level(global: &GlobalOptions, logging: &LoggingConfig) -> String {
    if global.quiet {
        "error".to_string()
    } else if global.verbose {
        "debug".to_string()
    } else {
        logging.level.clone()
    }
}

/// Install the global subscriber
///
/// An already-installed subscriber (e.g. from a host process) is kept.
pub fn init(global: &GlobalOptions, logging: &LoggingConfig) -> Result<()> {
    let level = level(global, logging);
    let filter = EnvFilter::try_new(&level)
        .with_context(|| format!("Invalid log level: {}", level))?;

    let writer = match logging.file {
        Some(ref path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false);

    let installed = match logging.format {
        LogFormat::Json => builder.json().finish().try_init(),
        LogFormat::Text => builder.finish().try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Using existing tracing subscriber");
    }

    Ok(())
}
