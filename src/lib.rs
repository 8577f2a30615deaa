//! skel materializes directory trees from declarative JSON structure specs.
//! It validates a spec, optionally backs up the target directory, creates every
//! directory, file and symlink the spec describes, and keeps a usage history.

/// Pre-run snapshots of non-empty target directories
pub mod backup;

/// Command-line interface module for the skel application
pub mod cli;

/// Process-wide settings resolved from flags, environment and defaults
pub mod config;

/// Common constants
pub mod constants;

/// Error types and handling for the skel application
pub mod error;

/// Persisted usage history and its summary
pub mod history;

/// Best-effort editor and file browser launchers
pub mod launcher;

/// Diagnostic logging setup
pub mod logger;

/// Filesystem creation of a validated spec
pub mod materializer;

/// Run orchestration: prepare, materialize, record
pub mod pipeline;

/// User confirmation handling
pub mod prompt;

/// Background execution of materialization runs
pub mod runner;

/// Structure spec model, loading and validation
pub mod spec;

/// Named, persisted specs
pub mod template;
