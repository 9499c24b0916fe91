// ABOUTME: Local snapshot loader used as the last context acquisition tier
// ABOUTME: Summarizes CSV or JSON data files into capped sample blocks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! Snapshot loading and text summarizers
//!
//! The CSV summarizer is shared with the export tier, whose artifacts are
//! CSV text as well.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    constants::sampling,
    errors::{BiError, BiResult},
    models::SampleBlock,
    powerbi::sampler::{render_cell, CELL_SEPARATOR},
};

/// Keep the header plus the first data lines of CSV text
///
/// Blank lines are ignored. Returns `None` when there is no data line.
#[must_use]
pub fn summarize_csv(label: impl Into<String>, text: &str) -> Option<SampleBlock> {
    let mut lines = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty());

    let header = lines.next()?.to_owned();
    let data: Vec<&str> = lines.collect();
    if data.is_empty() {
        return None;
    }

    Some(SampleBlock {
        label: label.into(),
        header: Some(header),
        lines: data
            .iter()
            .take(sampling::CSV_LINE_CAP)
            .map(|line| (*line).to_owned())
            .collect(),
        truncated: data.len().saturating_sub(sampling::CSV_LINE_CAP),
    })
}

/// Rows of a JSON snapshot: a bare array, or one under `data` or `rows`
fn normalize_rows(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(rows) => Some(rows),
        Value::Object(fields) => ["data", "rows"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_array)),
        _ => None,
    }
}

/// Summarize a parsed JSON snapshot
///
/// Rows are rendered like dataset samples, with the header taken from the
/// first object row. Values that do not normalize to rows fall back to a
/// truncated pretty-printed preview.
#[must_use]
pub fn summarize_json(label: impl Into<String>, value: &Value) -> Option<SampleBlock> {
    let label = label.into();

    let Some(rows) = normalize_rows(value) else {
        return Some(raw_preview(label, value));
    };
    if rows.is_empty() {
        return None;
    }

    let columns: Vec<String> = rows
        .iter()
        .find_map(Value::as_object)
        .map(|first| first.keys().cloned().collect())
        .unwrap_or_default();

    let lines = rows
        .iter()
        .take(sampling::JSON_ROW_CAP)
        .map(|row| match row {
            Value::Object(fields) if !columns.is_empty() => columns
                .iter()
                .map(|c| render_cell(fields.get(c)))
                .collect::<Vec<_>>()
                .join(CELL_SEPARATOR),
            other => render_cell(Some(other)),
        })
        .collect();

    Some(SampleBlock {
        label,
        header: (!columns.is_empty()).then(|| columns.join(CELL_SEPARATOR)),
        lines,
        truncated: rows.len().saturating_sub(sampling::JSON_ROW_CAP),
    })
}

fn raw_preview(label: String, value: &Value) -> SampleBlock {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    let mut preview: String = pretty.chars().take(sampling::RAW_PREVIEW_CHARS).collect();
    if preview.len() < pretty.len() {
        preview.push_str("\n... (preview truncated)");
    }
    SampleBlock {
        label,
        header: None,
        lines: vec![preview],
        truncated: 0,
    }
}

/// Read and summarize a snapshot file
///
/// Files ending in `.json` are parsed as JSON; anything else is read as CSV.
///
/// # Errors
///
/// Returns [`BiError::SnapshotFailure`] if the file cannot be read or its
/// JSON does not parse
pub async fn read_snapshot(path: &Path) -> BiResult<Option<SampleBlock>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BiError::SnapshotFailure(format!("{}: {e}", path.display())))?;

    let file_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let label = format!("Snapshot: {file_name}");

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| BiError::SnapshotFailure(format!("{}: {e}", path.display())))?;
        Ok(summarize_json(label, &value))
    } else {
        Ok(summarize_csv(label, &text))
    }
}

/// Snapshot tier entry point; failures are logged and yield `None`
pub async fn load_snapshot(path: &Path) -> Option<SampleBlock> {
    match read_snapshot(path).await {
        Ok(Some(block)) => Some(block),
        Ok(None) => {
            debug!(path = %path.display(), "Snapshot contained no rows");
            None
        }
        Err(e) => {
            warn!(error = %e, "Snapshot tier failed");
            None
        }
    }
}
