//! Usage history of materialization runs.
//!
//! The history is a JSON array of `{ "date", "template", "base_dir" }` records.
//! Every append rewrites the whole file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::MONTH_FORMAT;
use crate::error::{Error, Result};

/// One recorded run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "date", with = "iso8601")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "template")]
    pub template_name: String,
    #[serde(rename = "base_dir")]
    pub target_directory: String,
}

/// Summary of the recorded history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub total_structures: usize,
    /// Runs per template, in order of first appearance.
    pub template_usage: IndexMap<String, usize>,
    /// Ties go to the template that appears first in the history.
    pub most_used_template: Option<String>,
    /// Runs per calendar month (`YYYY-MM`), in chronological order.
    pub monthly_usage: BTreeMap<String, usize>,
    pub most_recent: Option<HistoryEntry>,
}

/// Append-only, JSON-backed run history.
#[derive(Debug)]
pub struct HistoryRecorder {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl HistoryRecorder {
    /// Loads the history stored at `path`. A missing file is an empty history.
    ///
    /// # Errors
    /// * `Error::HistoryError` if the file exists but cannot be read or parsed
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::HistoryError(format!("cannot read {}: {}", path.display(), e))
            })?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    Error::HistoryError(format!("invalid history file {}: {}", path.display(), e))
                })?
            }
        } else {
            debug!("History file {} does not exist yet", path.display());
            Vec::new()
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Appends a record stamped with the current local time and persists the history.
    pub fn record<S, P>(&mut self, template_name: S, target_dir: P) -> Result<&HistoryEntry>
    where
        S: Into<String>,
        P: AsRef<Path>,
    {
        self.record_at(Local::now().naive_local(), template_name, target_dir)
    }

    pub fn record_at<S, P>(
        &mut self,
        timestamp: NaiveDateTime,
        template_name: S,
        target_dir: P,
    ) -> Result<&HistoryEntry>
    where
        S: Into<String>,
        P: AsRef<Path>,
    {
        let entry = HistoryEntry {
            timestamp,
            template_name: template_name.into(),
            target_directory: target_dir.as_ref().display().to_string(),
        };
        debug!("Recording run of '{}' in {}", entry.template_name, entry.target_directory);

        self.entries.push(entry);
        if let Err(e) = self.persist() {
            self.entries.pop();
            return Err(e);
        }
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn summarize(&self) -> Analysis {
        summarize(&self.entries)
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::HistoryError(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content).map_err(|e| {
            Error::HistoryError(format!("cannot write {}: {}", self.path.display(), e))
        })
    }
}

/// Computes usage statistics over `entries`. An empty slice yields a zeroed summary.
pub fn summarize(entries: &[HistoryEntry]) -> Analysis {
    let mut template_usage: IndexMap<String, usize> = IndexMap::new();
    let mut monthly_usage: BTreeMap<String, usize> = BTreeMap::new();

    for entry in entries {
        *template_usage.entry(entry.template_name.clone()).or_default() += 1;
        *monthly_usage.entry(entry.timestamp.format(MONTH_FORMAT).to_string()).or_default() += 1;
    }

    let mut most_used: Option<(&String, usize)> = None;
    for (name, &count) in &template_usage {
        if most_used.map_or(true, |(_, best)| count > best) {
            most_used = Some((name, count));
        }
    }
    let most_used_template = most_used.map(|(name, _)| name.clone());

    Analysis {
        total_structures: entries.len(),
        most_used_template,
        template_usage,
        monthly_usage,
        most_recent: entries.iter().max_by_key(|entry| entry.timestamp).cloned(),
    }
}

/// ISO-8601 timestamps. Naive local times are written; values carrying an
/// offset are accepted on read and converted to local time.
mod iso8601 {
    use chrono::{DateTime, Local, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(with_offset) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(with_offset.with_timezone(&Local).naive_local());
        }
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_accepts_python_isoformat_dates() {
        let entry: HistoryEntry = serde_json::from_str(
            r#"{"date": "2024-05-01T10:20:30.123456", "template": "web", "base_dir": "/tmp/x"}"#,
        )
        .unwrap();
        assert_eq!(entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-05-01 10:20:30");
        assert_eq!(entry.template_name, "web");
    }

    #[test]
    fn test_entry_rejects_garbage_dates() {
        let result: std::result::Result<HistoryEntry, _> = serde_json::from_str(
            r#"{"date": "yesterday", "template": "web", "base_dir": "/tmp/x"}"#,
        );
        assert!(result.is_err());
    }
}
