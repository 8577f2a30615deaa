//! Run orchestration.
//!
//! A run resolves its spec, prepares the target (creating it or backing it up),
//! materializes the spec and records the invocation in the history:
//!
//! ```text
//! prepare ──► materialize (inline or through the async runner) ──► finish
//! ```
//!
//! Everything that can fail before the first filesystem mutation of the target
//! happens in [`Pipeline::prepare`].

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::backup::{needs_backup, BackupGuard};
use crate::config::{BackupPolicy, Config};
use crate::error::{Error, Result};
use crate::history::HistoryRecorder;
use crate::materializer::{Materializer, Outcome};
use crate::prompt::Prompter;
use crate::spec::{Spec, SpecLoader};
use crate::template::TemplateStore;

/// Where the spec of a run comes from.
#[derive(Debug, Clone)]
pub enum SpecSource {
    /// JSON spec file; the history records its file stem.
    File(PathBuf),
    /// Stored template key.
    Template(String),
    /// Already loaded spec with the name to record.
    Inline { name: String, spec: Spec },
}

/// A run that passed every pre-mutation check.
#[derive(Debug)]
pub struct Prepared {
    pub name: String,
    pub target_dir: PathBuf,
    pub spec: Spec,
    pub backup: Option<PathBuf>,
}

/// Final result of a run.
#[derive(Debug)]
pub struct Report {
    pub name: String,
    pub target_dir: PathBuf,
    pub backup: Option<PathBuf>,
    pub outcome: Outcome,
    /// False when the history could not be written; the run itself is unaffected.
    pub recorded: bool,
}

pub struct Pipeline<'a> {
    config: &'a Config,
    prompt: &'a dyn Prompter,
    loader: SpecLoader,
    guard: BackupGuard,
    templates: TemplateStore,
    history: HistoryRecorder,
}

impl<'a> Pipeline<'a> {
    /// Opens the template store and history named by `config`.
    pub fn new(config: &'a Config, prompt: &'a dyn Prompter) -> Result<Self> {
        let loader = if config.allow_unknown {
            SpecLoader::lenient()
        } else {
            SpecLoader::strict()
        };
        Ok(Self {
            config,
            prompt,
            loader,
            guard: BackupGuard::new(),
            templates: TemplateStore::open(&config.templates_dir)?,
            history: HistoryRecorder::open(&config.history_file)?,
        })
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    /// Resolves the spec, then creates or backs up the target.
    ///
    /// # Errors
    /// * `Error::ConfigError` for an invalid spec or a missing target when
    ///   `create_root` is off
    /// * `Error::TemplateNotFound` for an unknown template key
    /// * `Error::BackupError` if a requested backup failed
    pub fn prepare<P: AsRef<Path>>(&self, target_dir: P, source: SpecSource) -> Result<Prepared> {
        let target_dir = target_dir.as_ref().to_path_buf();
        let (name, spec) = self.resolve(source)?;
        debug!("Resolved spec '{}' with {} nodes", name, spec.node_count());

        let backup = if target_dir.exists() {
            self.maybe_backup(&target_dir)?
        } else if self.config.create_root {
            fs::create_dir_all(&target_dir).map_err(|e| Error::filesystem(&target_dir, e))?;
            info!("Created target directory {}", target_dir.display());
            None
        } else {
            return Err(Error::ConfigError(format!(
                "target directory {} does not exist",
                target_dir.display()
            )));
        };

        Ok(Prepared {
            name,
            target_dir,
            spec,
            backup,
        })
    }

    /// Records the run in the history and assembles the report.
    pub fn finish(&mut self, prepared: Prepared, outcome: Outcome) -> Report {
        let recorded = match self.history.record(&prepared.name, &prepared.target_dir) {
            Ok(_) => true,
            Err(e) => {
                error!("Could not record run in history: {}", e);
                false
            }
        };
        Report {
            name: prepared.name,
            target_dir: prepared.target_dir,
            backup: prepared.backup,
            outcome,
            recorded,
        }
    }

    /// Runs all steps on the calling thread.
    pub fn run<P: AsRef<Path>>(
        &mut self,
        materializer: &Materializer,
        target_dir: P,
        source: SpecSource,
    ) -> Result<Report> {
        let prepared = self.prepare(target_dir, source)?;
        let outcome = materializer.materialize(&prepared.target_dir, &prepared.spec);
        Ok(self.finish(prepared, outcome))
    }

    fn resolve(&self, source: SpecSource) -> Result<(String, Spec)> {
        match source {
            SpecSource::File(path) => {
                let spec = self.loader.load_file(&path)?;
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                Ok((name, spec))
            }
            SpecSource::Template(key) => {
                let template = self.templates.get(&key)?;
                Ok((template.name.clone(), template.structure.clone()))
            }
            SpecSource::Inline { name, spec } => Ok((name, spec)),
        }
    }

    fn maybe_backup(&self, target_dir: &Path) -> Result<Option<PathBuf>> {
        let wanted = match self.config.backup {
            BackupPolicy::Never => false,
            BackupPolicy::Always => true,
            BackupPolicy::Ask => {
                needs_backup(target_dir)?
                    && self.prompt.confirm(
                        false,
                        format!(
                            "Directory '{}' is not empty. Back it up first?",
                            target_dir.display()
                        ),
                    )?
            }
        };
        if !wanted {
            debug!("Backup skipped for {}", target_dir.display());
            return Ok(None);
        }
        self.guard.maybe_backup(target_dir)
    }
}
