//! Best-effort launchers for opening a generated directory in external programs.
//! Failures are reported to the caller and never affect the materialization result.

use std::path::Path;
use std::process::{Command, Stdio};

use log::{debug, info};

use crate::error::LaunchError;

/// Opens a directory in some external program.
pub trait Launcher {
    fn open(&self, path: &Path) -> Result<(), LaunchError>;
}

/// Opens a directory in a code editor invoked as `<command> <path>`.
#[derive(Debug, Clone)]
pub struct EditorLauncher {
    command: String,
}

impl EditorLauncher {
    pub fn new<S: Into<String>>(command: S) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Probes the editor with `--version`.
    pub fn is_installed(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl Launcher for EditorLauncher {
    fn open(&self, path: &Path) -> Result<(), LaunchError> {
        if !self.is_installed() {
            return Err(LaunchError::NotInstalled(self.command.clone()));
        }
        debug!("Opening {} with {}", path.display(), self.command);
        run(&self.command, path)?;
        info!("Opened {} in {}", path.display(), self.command);
        Ok(())
    }
}

/// Opens a directory in the platform file browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplorerLauncher;

impl ExplorerLauncher {
    pub fn new() -> Self {
        Self
    }

    pub fn program() -> &'static str {
        if cfg!(target_os = "windows") {
            "explorer"
        } else if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        }
    }
}

impl Launcher for ExplorerLauncher {
    fn open(&self, path: &Path) -> Result<(), LaunchError> {
        let program = Self::program();
        debug!("Opening {} with {}", path.display(), program);
        run(program, path)?;
        info!("Opened file browser in {}", path.display());
        Ok(())
    }
}

fn run(program: &str, path: &Path) -> Result<(), LaunchError> {
    let status = Command::new(program)
        .arg(path)
        .stdin(Stdio::null())
        .status()
        .map_err(|source| LaunchError::Io {
            program: program.to_string(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(LaunchError::Failed {
            program: program.to_string(),
            status,
        })
    }
}
