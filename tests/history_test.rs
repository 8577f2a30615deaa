use std::fs;

use chrono::{NaiveDate, NaiveDateTime};
use skel::error::Error;
use skel::history::{summarize, HistoryRecorder};
use tempfile::TempDir;

fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
}

#[test]
fn test_empty_history_summary() {
    let temp_dir = TempDir::new().unwrap();
    let history = HistoryRecorder::open(temp_dir.path().join("history.json")).unwrap();

    let analysis = history.summarize();

    assert_eq!(analysis.total_structures, 0);
    assert_eq!(analysis.most_used_template, None);
    assert!(analysis.template_usage.is_empty());
    assert!(analysis.monthly_usage.is_empty());
    assert_eq!(analysis.most_recent, None);
    assert_eq!(summarize(&[]), analysis);
}

#[test]
fn test_record_persists_whole_history() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state").join("history.json");

    let mut history = HistoryRecorder::open(&path).unwrap();
    history.record("web", "/projects/site").unwrap();
    history.record_at(at(2024, 2, 1, 9), "cli", "/projects/tool").unwrap();

    let stored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let records = stored.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["template"], "web");
    assert_eq!(records[0]["base_dir"], "/projects/site");
    assert_eq!(records[1]["date"], "2024-02-01T09:00:00");

    let reopened = HistoryRecorder::open(&path).unwrap();
    assert_eq!(reopened.entries(), history.entries());
}

#[test]
fn test_summary_statistics() {
    let temp_dir = TempDir::new().unwrap();
    let mut history = HistoryRecorder::open(temp_dir.path().join("history.json")).unwrap();
    history.record_at(at(2024, 1, 5, 10), "web", "/a").unwrap();
    history.record_at(at(2024, 1, 20, 10), "cli", "/b").unwrap();
    history.record_at(at(2024, 3, 2, 10), "cli", "/c").unwrap();
    history.record_at(at(2023, 12, 31, 23), "lib", "/d").unwrap();
    history.record_at(at(2024, 3, 1, 8), "web", "/e").unwrap();

    let analysis = history.summarize();

    assert_eq!(analysis.total_structures, 5);
    assert_eq!(
        analysis.template_usage.iter().map(|(k, v)| (k.as_str(), *v)).collect::<Vec<_>>(),
        vec![("web", 2), ("cli", 2), ("lib", 1)]
    );
    // "web" and "cli" tie; "web" was seen first.
    assert_eq!(analysis.most_used_template.as_deref(), Some("web"));
    assert_eq!(
        analysis.monthly_usage.iter().map(|(k, v)| (k.as_str(), *v)).collect::<Vec<_>>(),
        vec![("2023-12", 1), ("2024-01", 2), ("2024-03", 2)]
    );
    let most_recent = analysis.most_recent.unwrap();
    assert_eq!(most_recent.target_directory, "/c");
    assert_eq!(most_recent.timestamp, at(2024, 3, 2, 10));
}

#[test]
fn test_most_used_template_wins_outright() {
    let temp_dir = TempDir::new().unwrap();
    let mut history = HistoryRecorder::open(temp_dir.path().join("history.json")).unwrap();
    history.record_at(at(2024, 5, 1, 1), "a", "/x").unwrap();
    history.record_at(at(2024, 5, 1, 2), "b", "/x").unwrap();
    history.record_at(at(2024, 5, 1, 3), "b", "/x").unwrap();

    assert_eq!(history.summarize().most_used_template.as_deref(), Some("b"));
}

#[test]
fn test_invalid_history_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(HistoryRecorder::open(&path), Err(Error::HistoryError(_))));
}

#[test]
fn test_empty_history_file_is_empty_history() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.json");
    fs::write(&path, "").unwrap();

    assert!(HistoryRecorder::open(&path).unwrap().entries().is_empty());
}
