//! Pre-run snapshots of the target directory.
//!
//! A non-empty target is copied to a sibling directory named
//! `<target_name>_backup_<timestamp>` before anything is written into it.
//! Backups are never read back; recovery is manual.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::constants::{BACKUP_INFIX, BACKUP_TIMESTAMP_FORMAT};
use crate::error::{Error, Result};
use crate::materializer::create_symlink;

/// Snapshots a target directory before materialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackupGuard;

impl BackupGuard {
    pub fn new() -> Self {
        Self
    }

    /// Backs up `target_dir` if it exists and contains at least one entry.
    ///
    /// # Returns
    /// * `Ok(Some(path))` - location of the backup
    /// * `Ok(None)` - the target is missing or empty
    ///
    /// # Errors
    /// * `Error::BackupError` if the copy cannot complete; the run must not proceed
    pub fn maybe_backup<P: AsRef<Path>>(&self, target_dir: P) -> Result<Option<PathBuf>> {
        self.maybe_backup_at(target_dir, Local::now().naive_local())
    }

    /// Same as [`BackupGuard::maybe_backup`] with an explicit timestamp.
    pub fn maybe_backup_at<P: AsRef<Path>>(
        &self,
        target_dir: P,
        timestamp: NaiveDateTime,
    ) -> Result<Option<PathBuf>> {
        let target_dir = target_dir.as_ref();
        if !needs_backup(target_dir)? {
            debug!("No backup needed for {}", target_dir.display());
            return Ok(None);
        }

        let backup_dir = backup_path(target_dir, timestamp)?;
        info!("Backing up {} to {}", target_dir.display(), backup_dir.display());

        if let Err(e) = copy_tree(target_dir, &backup_dir) {
            if backup_dir.exists() {
                if let Err(cleanup) = fs::remove_dir_all(&backup_dir) {
                    warn!("Could not remove partial backup {}: {}", backup_dir.display(), cleanup);
                }
            }
            return Err(Error::BackupError(format!(
                "copying {} to {} failed: {}",
                target_dir.display(),
                backup_dir.display(),
                e
            )));
        }

        Ok(Some(backup_dir))
    }
}

/// Returns true when `target_dir` exists and has at least one entry.
///
/// # Errors
/// * `Error::BackupError` if the target exists but is not a readable directory
pub fn needs_backup(target_dir: &Path) -> Result<bool> {
    match fs::symlink_metadata(target_dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => {
            return Err(Error::BackupError(format!(
                "cannot inspect {}: {}",
                target_dir.display(),
                e
            )))
        }
        Ok(_) if !target_dir.is_dir() => {
            return Err(Error::BackupError(format!(
                "{} is not a directory",
                target_dir.display()
            )))
        }
        Ok(_) => {}
    }

    let mut entries = fs::read_dir(target_dir).map_err(|e| {
        Error::BackupError(format!("cannot read {}: {}", target_dir.display(), e))
    })?;
    Ok(entries.next().is_some())
}

/// Computes the first free sibling path `<name>_backup_<timestamp>[_N]`.
pub fn backup_path(target_dir: &Path, timestamp: NaiveDateTime) -> Result<PathBuf> {
    let absolute;
    let target_dir = if target_dir.file_name().is_some() {
        target_dir
    } else {
        absolute = target_dir.canonicalize().map_err(|e| {
            Error::BackupError(format!("cannot resolve {}: {}", target_dir.display(), e))
        })?;
        absolute.as_path()
    };

    let name = target_dir.file_name().ok_or_else(|| {
        Error::BackupError(format!("{} has no directory name", target_dir.display()))
    })?;
    let parent = target_dir.parent().unwrap_or_else(|| Path::new(""));

    let base = format!(
        "{}{}{}",
        name.to_string_lossy(),
        BACKUP_INFIX,
        timestamp.format(BACKUP_TIMESTAMP_FORMAT)
    );
    let mut candidate = parent.join(&base);
    let mut suffix = 1;
    while fs::symlink_metadata(&candidate).is_ok() {
        candidate = parent.join(format!("{base}_{suffix}"));
        suffix += 1;
    }
    Ok(candidate)
}

/// Recursively copies `source` to `dest`, keeping symlinks as links.
fn copy_tree(source: &Path, dest: &Path) -> io::Result<()> {
    let mut directories = Vec::new();

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let to = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&to)?;
            directories.push((to, entry.metadata().map_err(io::Error::from)?.permissions()));
        } else if file_type.is_symlink() {
            let link_target = fs::read_link(entry.path())?;
            create_symlink(&link_target, &to)?;
        } else {
            fs::copy(entry.path(), &to)?;
        }
    }

    // Deepest first, so read-only directories are sealed after their contents.
    for (dir, permissions) in directories.into_iter().rev() {
        fs::set_permissions(&dir, permissions)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(14, 5, 7).unwrap()
    }

    #[test]
    fn test_backup_path_is_a_timestamped_sibling() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("project");

        let path = backup_path(&target, timestamp()).unwrap();
        assert_eq!(path, temp_dir.path().join("project_backup_20240309_140507"));
    }

    #[test]
    fn test_backup_path_skips_taken_names() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("project");
        fs::create_dir(temp_dir.path().join("project_backup_20240309_140507")).unwrap();

        let path = backup_path(&target, timestamp()).unwrap();
        assert_eq!(path, temp_dir.path().join("project_backup_20240309_140507_1"));
    }
}
