use std::fs;

use chrono::NaiveDate;
use skel::backup::{needs_backup, BackupGuard};
use skel::error::Error;
use tempfile::TempDir;

#[test]
fn test_missing_target_is_not_backed_up() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("missing");

    assert_eq!(BackupGuard::new().maybe_backup(&target).unwrap(), None);
}

#[test]
fn test_empty_target_is_not_backed_up() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("empty");
    fs::create_dir(&target).unwrap();

    assert!(!needs_backup(&target).unwrap());
    assert_eq!(BackupGuard::new().maybe_backup(&target).unwrap(), None);
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
}

#[test]
fn test_non_empty_target_is_copied_to_a_sibling() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("project");
    fs::create_dir_all(target.join("src/nested")).unwrap();
    fs::write(target.join("src/main.rs"), "fn main() {}").unwrap();
    fs::write(target.join("src/nested/data.bin"), [0u8, 1, 2, 255]).unwrap();
    fs::write(target.join("README.md"), "# project").unwrap();
    let timestamp = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap().and_hms_opt(3, 4, 5).unwrap();

    let backup = BackupGuard::new().maybe_backup_at(&target, timestamp).unwrap().unwrap();

    assert_eq!(backup, temp_dir.path().join("project_backup_20250102_030405"));
    assert!(!dir_diff::is_different(&target, &backup).unwrap());
    assert_eq!(fs::read_to_string(target.join("README.md")).unwrap(), "# project");
}

#[test]
fn test_backup_name_uses_current_time() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("site");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("index.html"), "<html></html>").unwrap();

    let backup = BackupGuard::new().maybe_backup(&target).unwrap().unwrap();

    let name = backup.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("site_backup_"), "{name}");
    assert_eq!(backup.parent(), Some(temp_dir.path()));
    assert!(backup.join("index.html").is_file());
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_copied_as_links() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("links");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("real.txt"), "real").unwrap();
    std::os::unix::fs::symlink("real.txt", target.join("alias")).unwrap();
    std::os::unix::fs::symlink("does-not-exist", target.join("dangling")).unwrap();

    let backup = BackupGuard::new().maybe_backup(&target).unwrap().unwrap();

    assert_eq!(fs::read_link(backup.join("alias")).unwrap().to_str(), Some("real.txt"));
    assert_eq!(fs::read_link(backup.join("dangling")).unwrap().to_str(), Some("does-not-exist"));
}

#[test]
fn test_file_target_is_a_backup_error() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("plain.txt");
    fs::write(&target, "not a directory").unwrap();

    let result = BackupGuard::new().maybe_backup(&target);
    assert!(matches!(result, Err(Error::BackupError(_))));
}
