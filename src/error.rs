//! Error handling for skel.
//! Defines the error taxonomy shared by the loader, materializer, backup guard,
//! template store and history recorder.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for skel operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or invalid structure spec. Raised before any filesystem mutation.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O failure while materializing a node.
    #[error("Filesystem error at '{}': {source}", .path.display())]
    FilesystemError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The pre-run snapshot of the target directory could not be made.
    #[error("Backup error: {0}")]
    BackupError(String),

    /// A stored template could not be read or written.
    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Template '{name}' not found")]
    TemplateNotFound { name: String },

    /// The history store could not be read or written.
    #[error("History error: {0}")]
    HistoryError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn filesystem<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Error::FilesystemError {
            path: path.into(),
            source,
        }
    }
}

/// Convenience type alias for Results with [`Error`] as the default error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of the best-effort external launchers (editor, file explorer).
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("'{0}' is not installed or not on PATH")]
    NotInstalled(String),

    #[error("'{program}' exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },

    #[error("failed to launch '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Default error handler that prints the error and exits the program.
///
/// # Behavior
/// Prints the error message to stderr, logs it to the diagnostic log
/// and exits with status code 1.
pub fn default_error_handler(err: anyhow::Error) -> ! {
    log::error!("{:#}", err);
    eprintln!("{:#}", err);
    std::process::exit(1);
}
