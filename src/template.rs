//! Persisted, named structure specs.
//!
//! Each template lives in `<templates_dir>/<key>.json` as
//! `{ "name": ..., "description": ..., "structure": [ ...spec nodes... ] }`.
//! The file stem is the key. Saving under an existing key replaces the template.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::constants::TEMPLATE_EXTENSION;
use crate::error::{Error, Result};
use crate::spec::Spec;

/// A named, described spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub structure: Spec,
}

impl Template {
    pub fn new<N: Into<String>, D: Into<String>>(name: N, description: D, structure: Spec) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            structure,
        }
    }
}

/// Directory-backed template collection, loaded once and written back on mutation.
#[derive(Debug)]
pub struct TemplateStore {
    dir: PathBuf,
    templates: IndexMap<String, Template>,
}

impl TemplateStore {
    /// Loads every `*.json` template in `dir`. A missing directory is an empty store.
    ///
    /// Unreadable or invalid documents are skipped with a warning so one broken
    /// file does not hide the rest of the store.
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        let mut templates = IndexMap::new();

        if dir.is_dir() {
            let mut paths = fs::read_dir(&dir)
                .map_err(|e| {
                    Error::TemplateError(format!("cannot read {}: {}", dir.display(), e))
                })?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| {
                    path.is_file()
                        && path.extension().and_then(|ext| ext.to_str()) == Some(TEMPLATE_EXTENSION)
                })
                .collect::<Vec<_>>();
            paths.sort();

            for path in paths {
                let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
                    continue;
                };
                match read_template(&path) {
                    Ok(template) => {
                        debug!("Loaded template '{}' from {}", key, path.display());
                        templates.insert(key.to_string(), template);
                    }
                    Err(e) => warn!("Skipping template {}: {}", path.display(), e),
                }
            }
        } else {
            debug!("Template directory {} does not exist yet", dir.display());
        }

        Ok(Self { dir, templates })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Template keys in load order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn list(&self) -> impl Iterator<Item = (&str, &Template)> {
        self.templates.iter().map(|(key, template)| (key.as_str(), template))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// # Errors
    /// * `Error::TemplateNotFound` if no template is stored under `key`
    pub fn get(&self, key: &str) -> Result<&Template> {
        self.templates
            .get(key)
            .ok_or_else(|| Error::TemplateNotFound {
                name: key.to_string(),
            })
    }

    /// Stores `template` under `key`, replacing any previous template with that key.
    pub fn save(&mut self, key: &str, template: Template) -> Result<()> {
        validate_key(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::TemplateError(format!("cannot create {}: {}", self.dir.display(), e))
        })?;

        let path = self.path_for(key);
        let content = serde_json::to_string_pretty(&template)?;
        fs::write(&path, content).map_err(|e| {
            Error::TemplateError(format!("cannot write {}: {}", path.display(), e))
        })?;
        debug!("Saved template '{}' to {}", key, path.display());

        self.templates.insert(key.to_string(), template);
        Ok(())
    }

    /// Deletes the template stored under `key` and returns it.
    pub fn remove(&mut self, key: &str) -> Result<Template> {
        if !self.templates.contains_key(key) {
            return Err(Error::TemplateNotFound {
                name: key.to_string(),
            });
        }
        let path = self.path_for(key);
        fs::remove_file(&path).map_err(|e| {
            Error::TemplateError(format!("cannot remove {}: {}", path.display(), e))
        })?;
        self.templates
            .shift_remove(key)
            .ok_or_else(|| Error::TemplateNotFound {
                name: key.to_string(),
            })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{TEMPLATE_EXTENSION}"))
    }
}

fn read_template(path: &Path) -> Result<Template> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::TemplateError(format!("invalid template document: {}", e)))
}

/// Keys become file stems, so they must be a single plain path segment.
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.trim().is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\'])
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(Error::TemplateError(format!("invalid template key '{key}'")))
    }
}
