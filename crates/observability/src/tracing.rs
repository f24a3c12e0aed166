//! Tracing/logging initialization.
//!
//! JSON lines to stdout, optionally mirrored to an append-only file.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::LogConfig;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("cannot open log file {path}: {source}")]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops). The log file,
/// if any, is opened before installation so a bad path fails every call.
pub fn init(config: &LogConfig) -> Result<(), ObservabilityError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| ObservabilityError::OpenLogFile {
                    path: path.clone(),
                    source,
                })?;
            Some(
                fmt::layer()
                    .json()
                    .with_timer(fmt::time::SystemTime)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    // Targets are kept so audit lines (`gatehouse::audit`) can be filtered.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_timer(fmt::time::SystemTime))
        .with(file_layer)
        .try_init();

    Ok(())
}
