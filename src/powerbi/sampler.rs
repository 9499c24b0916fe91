// ABOUTME: Bounded row sampling for discovered tables through TOPN DAX queries
// ABOUTME: Renders result rows as pipe-separated lines with explicit null handling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

use serde_json::Value;
use tracing::{debug, warn};

use super::{AccessToken, PowerBiClient, QueryRow};
use crate::{
    config::ReportTarget,
    constants::sampling,
    models::{SampleBlock, TableSchema},
};

/// Cell separator in rendered rows and headers
pub const CELL_SEPARATOR: &str = " | ";

/// Quote a table name for DAX (`'Sales ''25'`)
fn quote_table(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Fully qualified DAX column reference (`'Sales'[Amount]`)
fn column_ref(table: &str, column: &str) -> String {
    format!("{}[{}]", quote_table(table), column.replace(']', "]]"))
}

/// Columns selected for sampling
#[must_use]
pub fn selected_columns(table: &TableSchema) -> &[String] {
    let end = table.columns.len().min(sampling::MAX_COLUMNS);
    &table.columns[..end]
}

/// Build the grouped `TOPN` sample query for a table
///
/// Returns `None` for a table without columns.
#[must_use]
pub fn build_sample_query(table: &TableSchema) -> Option<String> {
    let columns = selected_columns(table);
    let first = columns.first()?;
    let group_by = columns
        .iter()
        .map(|c| column_ref(&table.name, c))
        .collect::<Vec<_>>()
        .join(", ");

    Some(format!(
        "EVALUATE TOPN({}, SUMMARIZE({}, {group_by}), {}, ASC)",
        sampling::QUERY_ROW_LIMIT,
        quote_table(&table.name),
        column_ref(&table.name, first),
    ))
}

/// Render one cell value
///
/// Missing and `null` render as `null`; objects and arrays render as JSON.
#[must_use]
pub fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_owned(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => serde_json::to_string(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Look a column up in a result row
///
/// Query results key cells as `Table[Column]`; bare `[Column]` and `Column`
/// keys are accepted too.
fn lookup_cell<'a>(row: &'a QueryRow, table: &str, column: &str) -> Option<&'a Value> {
    row.get(&format!("{table}[{column}]"))
        .or_else(|| row.get(&format!("[{column}]")))
        .or_else(|| row.get(column))
}

/// Render a result row for the selected columns
#[must_use]
pub fn render_row(row: &QueryRow, table: &str, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| render_cell(lookup_cell(row, table, c)))
        .collect::<Vec<_>>()
        .join(CELL_SEPARATOR)
}

/// Format query rows into a capped sample block
#[must_use]
pub fn format_table_sample(table: &TableSchema, rows: &[QueryRow]) -> SampleBlock {
    let columns = selected_columns(table);
    SampleBlock {
        label: format!("Table: {}", table.name),
        header: Some(columns.join(CELL_SEPARATOR)),
        lines: rows
            .iter()
            .take(sampling::DATASET_ROW_CAP)
            .map(|row| render_row(row, &table.name, columns))
            .collect(),
        truncated: rows.len().saturating_sub(sampling::DATASET_ROW_CAP),
    }
}

impl PowerBiClient {
    /// Sample up to the first three tables, one query at a time
    ///
    /// A failing table is logged and skipped; tables that return no rows
    /// contribute nothing.
    pub async fn sample_tables(
        &self,
        token: &AccessToken,
        target: &ReportTarget,
        dataset_id: &str,
        tables: &[TableSchema],
    ) -> Vec<SampleBlock> {
        let mut blocks = Vec::new();

        for table in tables.iter().take(sampling::MAX_TABLES) {
            let Some(query) = build_sample_query(table) else {
                continue;
            };

            match self.execute_query(token, target, dataset_id, &query).await {
                Ok(rows) if rows.is_empty() => {
                    debug!(table = %table.name, "Sample query returned no rows");
                }
                Ok(rows) => blocks.push(format_table_sample(table, &rows)),
                Err(e) => {
                    warn!(table = %table.name, error = %e, "Sample query failed, skipping table");
                }
            }
        }

        blocks
    }
}
