// ABOUTME: Tests for snapshot file loading and the CSV/JSON summarizers
// ABOUTME: Uses temporary files to cover format detection, caps, and unreadable input
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::fmt::Write;

use powerbi_chat_bridge::{
    errors::BiError,
    snapshot::{load_snapshot, read_snapshot, summarize_csv, summarize_json},
};
use serde_json::json;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_csv_keeps_header_and_fifteen_lines() {
    let mut csv = String::from("Day,Calls\n");
    for i in 1..=20 {
        writeln!(csv, "D{i},{i}").unwrap();
    }

    let block = summarize_csv("Snapshot: calls.csv", &csv).unwrap();

    assert_eq!(block.header.as_deref(), Some("Day,Calls"));
    assert_eq!(block.lines.len(), 15);
    assert_eq!(block.lines.first().map(String::as_str), Some("D1,1"));
    assert_eq!(block.lines.last().map(String::as_str), Some("D15,15"));
    assert_eq!(block.truncated, 5);
    assert!(block.render().ends_with("D15,15\n... 5 more rows truncated"));
}

#[test]
fn test_csv_ignores_blank_lines_and_carriage_returns() {
    let block = summarize_csv("x", "a,b\r\n\r\n1,2\r\n\n3,4\r\n").unwrap();

    assert_eq!(block.header.as_deref(), Some("a,b"));
    assert_eq!(block.lines, vec!["1,2", "3,4"]);
    assert_eq!(block.truncated, 0);
}

#[test]
fn test_csv_without_data_lines_is_empty() {
    assert!(summarize_csv("x", "").is_none());
    assert!(summarize_csv("x", "only,a,header\n\n").is_none());
}

#[test]
fn test_json_array_rows() {
    let value = json!([{"day": "Mon", "total": 4}, {"day": "Tue", "total": null}]);

    let block = summarize_json("Snapshot: s.json", &value).unwrap();

    assert_eq!(block.render(), "Snapshot: s.json\nday | total\nMon | 4\nTue | null");
}

#[test]
fn test_json_rows_under_data_or_rows_key() {
    let under_rows = json!({"rows": [{"k": 1}]});
    let under_data = json!({"data": [{"k": 2}], "rows": [{"k": 1}]});

    assert_eq!(summarize_json("x", &under_rows).unwrap().lines, vec!["1"]);
    assert_eq!(summarize_json("x", &under_data).unwrap().lines, vec!["2"]);
}

#[test]
fn test_json_caps_rows_at_ten() {
    let rows: Vec<_> = (0..12).map(|i| json!({ "n": i })).collect();

    let block = summarize_json("x", &json!(rows)).unwrap();

    assert_eq!(block.lines.len(), 10);
    assert_eq!(block.truncated, 2);
}

#[test]
fn test_empty_json_array_is_empty() {
    assert!(summarize_json("x", &json!([])).is_none());
    assert!(summarize_json("x", &json!({"data": []})).is_none());
}

#[test]
fn test_unrecognized_json_falls_back_to_preview() {
    let value = json!({"summary": {"calls": 42}});

    let block = summarize_json("x", &value).unwrap();

    assert!(block.header.is_none());
    assert_eq!(block.lines.len(), 1);
    assert!(block.lines[0].contains("\"calls\": 42"));
    assert!(!block.lines[0].contains("preview truncated"));
}

#[test]
fn test_large_json_preview_is_truncated() {
    let value = json!({"blob": "x".repeat(5000)});

    let block = summarize_json("x", &value).unwrap();

    assert!(block.lines[0].ends_with("\n... (preview truncated)"));
    assert!(block.lines[0].chars().count() < 2100);
}

#[tokio::test]
async fn test_read_csv_snapshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "ops.csv", "Terminal,TEU\nNorth,840\n");

    let block = read_snapshot(&path).await.unwrap().unwrap();

    assert_eq!(block.label, "Snapshot: ops.csv");
    assert_eq!(block.lines, vec!["North,840"]);
}

#[tokio::test]
async fn test_json_extension_selects_json_parser() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "ops.JSON", r#"[{"terminal": "North"}]"#);

    let block = read_snapshot(&path).await.unwrap().unwrap();

    assert_eq!(block.header.as_deref(), Some("terminal"));
    assert_eq!(block.lines, vec!["North"]);
}

#[tokio::test]
async fn test_missing_file_is_a_snapshot_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.csv");

    let result = read_snapshot(&path).await;

    assert!(matches!(result, Err(BiError::SnapshotFailure(_))));
    assert!(load_snapshot(&path).await.is_none());
}

#[tokio::test]
async fn test_malformed_json_is_a_snapshot_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "broken.json", "{not json");

    assert!(matches!(
        read_snapshot(&path).await,
        Err(BiError::SnapshotFailure(_))
    ));
    assert!(load_snapshot(&path).await.is_none());
}
