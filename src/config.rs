//! Process-wide settings.
//! A [`Config`] is built once per process from CLI overrides, the environment and
//! defaults, and handed to the components that need it.

use std::env;
use std::path::PathBuf;

use log::debug;

use crate::constants::{
    APP_DIR, DEFAULT_EDITOR, ENV_EDITOR, ENV_EDITOR_LEGACY, ENV_HOME, ENV_LOG_FILE, HISTORY_FILE,
    TEMPLATES_DIR,
};
use crate::error::{Error, Result};

/// What to do when the target directory already has content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackupPolicy {
    Always,
    Never,
    /// Ask through the prompter.
    #[default]
    Ask,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Data home holding the template store and the history file.
    pub home: PathBuf,
    pub templates_dir: PathBuf,
    pub history_file: PathBuf,
    /// Diagnostic log destination; stderr when unset.
    pub log_file: Option<PathBuf>,
    /// Editor command used by the editor launcher.
    pub editor: String,
    pub backup: BackupPolicy,
    /// Create a missing target directory instead of failing.
    pub create_root: bool,
    /// Keep unknown node kinds (warned and skipped) instead of rejecting the spec.
    pub allow_unknown: bool,
}

/// Values given on the command line; they take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub home: Option<PathBuf>,
    pub editor: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Builds a config rooted at `home` with default settings.
    pub fn with_home<P: Into<PathBuf>>(home: P) -> Self {
        let home = home.into();
        Self {
            templates_dir: home.join(TEMPLATES_DIR),
            history_file: home.join(HISTORY_FILE),
            home,
            log_file: None,
            editor: DEFAULT_EDITOR.to_string(),
            backup: BackupPolicy::default(),
            create_root: true,
            allow_unknown: false,
        }
    }

    /// Resolves the config from overrides, then environment, then defaults.
    ///
    /// # Errors
    /// * `Error::ConfigError` if no data directory can be determined
    pub fn load(overrides: Overrides) -> Result<Self> {
        let home = match overrides.home.or_else(|| env_path(ENV_HOME)) {
            Some(home) => home,
            None => default_home()?,
        };
        debug!("Using data home {}", home.display());

        let mut config = Self::with_home(home);
        if let Some(editor) = overrides
            .editor
            .or_else(|| env_string(ENV_EDITOR))
            .or_else(|| env_string(ENV_EDITOR_LEGACY))
        {
            config.editor = editor;
        }
        config.log_file = overrides.log_file.or_else(|| env_path(ENV_LOG_FILE));
        Ok(config)
    }
}

/// Platform data directory joined with the application directory name.
pub fn default_home() -> Result<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR)).ok_or_else(|| {
        Error::ConfigError(format!("cannot determine a data directory; set {ENV_HOME}"))
    })
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_string(key).map(PathBuf::from)
}
