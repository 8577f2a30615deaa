//! Diagnostic logging setup.

use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::error::{Error, Result};

/// Initializes the global logger.
///
/// Without a log file, records go to stderr: warnings and errors by default,
/// everything down to debug with `verbose`. With a log file, records are appended
/// to it starting at info level, so every run leaves a persisted trace.
/// `RUST_LOG` overrides the level in both cases.
pub fn init_logger(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::new();

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let level = if verbose {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            };
            builder
                .filter_level(level)
                .target(env_logger::Target::Pipe(Box::new(file)))
                .format_timestamp_secs();
        }
        None => {
            builder.filter_level(if verbose {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Warn
            });
        }
    }

    builder
        .parse_default_env()
        .try_init()
        .map_err(|e| Error::ConfigError(format!("logger already initialized: {}", e)))
}
