// ABOUTME: Core data models for report metadata, table schemas, and rendered context
// ABOUTME: Defines SampleBlock and ContextBlock, the text fragments injected into prompts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! # Data Models
//!
//! Per-request values produced by the context pipeline. Nothing here is
//! cached: every chat request builds fresh instances and drops them once the
//! completion call returns.

use serde::{Deserialize, Serialize};

/// Dataset binding and display name of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Backing dataset identifier
    pub dataset_id: String,
    /// Report display name
    pub name: String,
}

/// A table and the ordered names of its columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name as it appears in queries
    pub name: String,
    /// Column names in declaration order
    pub columns: Vec<String>,
}

impl TableSchema {
    /// Build a schema from a name and column names
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Tables without columns cannot be sampled
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// One rendered fragment of sampled data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBlock {
    /// Label line, e.g. `Table: Sales`
    pub label: String,
    /// Header line, absent for free-form previews
    pub header: Option<String>,
    /// Rendered data lines, already capped
    pub lines: Vec<String>,
    /// Lines dropped by the cap
    pub truncated: usize,
}

impl SampleBlock {
    /// Render the block as text
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.label.clone();
        if let Some(header) = &self.header {
            out.push('\n');
            out.push_str(header);
        }
        for line in &self.lines {
            out.push('\n');
            out.push_str(line);
        }
        if self.truncated > 0 {
            out.push('\n');
            out.push_str(&truncation_marker(self.truncated));
        }
        out
    }
}

/// Trailing marker for capped output
#[must_use]
pub fn truncation_marker(remaining: usize) -> String {
    format!("... {remaining} more rows truncated")
}

/// The text injected into the conversation as grounding context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock {
    /// Report label line
    pub report_label: String,
    /// Sample fragments from the winning tier, in order
    pub blocks: Vec<SampleBlock>,
    /// Shown instead of blocks when no tier produced data
    pub placeholder: Option<String>,
}

impl ContextBlock {
    /// Context carrying sampled data
    #[must_use]
    pub fn with_samples(report: &ReportMetadata, blocks: Vec<SampleBlock>) -> Self {
        Self {
            report_label: report_label(report),
            blocks,
            placeholder: None,
        }
    }

    /// Context for a resolved report whose data could not be sampled
    #[must_use]
    pub fn unsampleable(report: &ReportMetadata) -> Self {
        Self {
            report_label: report_label(report),
            blocks: Vec::new(),
            placeholder: Some(
                "The report is available but no sample data could be retrieved for it.".to_owned(),
            ),
        }
    }

    /// Render label and blocks separated by blank lines
    #[must_use]
    pub fn render(&self) -> String {
        let mut sections = Vec::with_capacity(self.blocks.len() + 2);
        sections.push(self.report_label.clone());
        if let Some(placeholder) = &self.placeholder {
            sections.push(placeholder.clone());
        }
        sections.extend(self.blocks.iter().map(SampleBlock::render));
        sections.join("\n\n")
    }
}

fn report_label(report: &ReportMetadata) -> String {
    format!("Power BI report: {}", report.name)
}
