// ABOUTME: Dataset schema discovery with a metadata-query fallback and a manual catalog
// ABOUTME: Lists tables and columns, tolerating field-name variance in INFO view results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! # Schema Discovery
//!
//! Strategies, tried in order:
//!
//! 1. **Direct listing** of the dataset's tables. Only push-API datasets
//!    support it.
//! 2. **Metadata queries** against the `INFO.TABLES()` / `INFO.COLUMNS()`
//!    views, used when direct listing answers 404 "not a push API dataset".
//! 3. **Manual catalog**, the configured fallback schema, used when the
//!    metadata queries yield nothing or fail.
//!
//! Tables that end up without columns are never returned.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{read_body, AccessToken, PowerBiClient, QueryRow};
use crate::{
    config::ReportTarget,
    errors::{BiError, BiResult},
    models::TableSchema,
};

/// Lists non-hidden tables with their ids
pub const TABLES_METADATA_QUERY: &str = "EVALUATE SELECTCOLUMNS(FILTER(INFO.TABLES(), NOT [IsHidden]), \"TableID\", [ID], \"TableName\", [Name])";

/// Lists non-hidden columns keyed by owning table id
pub const COLUMNS_METADATA_QUERY: &str = "EVALUATE SELECTCOLUMNS(FILTER(INFO.COLUMNS(), NOT [IsHidden]), \"TableID\", [TableID], \"ColumnName\", [ExplicitName])";

/// Table name keys in a table row, in priority order
const TABLE_NAME_KEYS: &[&str] = &["[TableName]", "TableName", "[Name]", "Name"];

/// Table id keys in table and column rows, in priority order
const TABLE_ID_KEYS: &[&str] = &["[TableID]", "TableID", "[ID]", "ID"];

/// Owning-table name keys in a column row, in priority order
const COLUMN_TABLE_KEYS: &[&str] = &["[TableName]", "TableName", "[Table]", "Table"];

/// Column name keys in a column row, in priority order
const COLUMN_NAME_KEYS: &[&str] = &[
    "[ColumnName]",
    "ColumnName",
    "[ExplicitName]",
    "ExplicitName",
    "[InferredName]",
    "InferredName",
];

/// Prefix of the engine's internal row-number columns
const ROW_NUMBER_PREFIX: &str = "RowNumber-";

/// Which strategy produced a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSource {
    /// Direct table listing
    DirectListing,
    /// `INFO.*` metadata queries
    MetadataQuery,
    /// Configured manual catalog
    ManualCatalog,
}

/// Discovered tables and where they came from
#[derive(Debug, Clone)]
pub struct DiscoveredSchema {
    /// Usable tables, in discovery order
    pub tables: Vec<TableSchema>,
    /// Strategy that produced them
    pub source: SchemaSource,
}

/// Outcome of the direct listing endpoint
#[derive(Debug)]
enum DirectListing {
    Tables(Vec<TableSchema>),
    NotPushDataset,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableEntry {
    name: String,
    #[serde(default)]
    is_hidden: bool,
    #[serde(default)]
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnEntry {
    name: String,
    #[serde(default)]
    is_hidden: bool,
}

#[derive(Debug, Deserialize)]
struct TableList {
    #[serde(default)]
    value: Vec<TableEntry>,
}

impl PowerBiClient {
    /// Discover the sampleable tables of a dataset
    ///
    /// # Errors
    ///
    /// Returns [`BiError::SchemaFailure`] when direct listing fails for any
    /// reason other than the dataset not being a push-API dataset
    pub async fn discover_schema(
        &self,
        token: &AccessToken,
        target: &ReportTarget,
        dataset_id: &str,
        fallback_catalog: &[TableSchema],
    ) -> BiResult<DiscoveredSchema> {
        let (tables, source) = match self.list_tables_direct(token, target, dataset_id).await? {
            DirectListing::Tables(tables) => (tables, SchemaSource::DirectListing),
            DirectListing::NotPushDataset => {
                info!(dataset_id, "Direct table listing unavailable, querying INFO views");
                match self.query_schema_metadata(token, target, dataset_id).await {
                    Ok(tables) if tables.iter().any(TableSchema::is_usable) => {
                        (tables, SchemaSource::MetadataQuery)
                    }
                    Ok(_) => {
                        warn!(dataset_id, "Metadata queries returned no columns, using manual catalog");
                        (fallback_catalog.to_vec(), SchemaSource::ManualCatalog)
                    }
                    Err(e) => {
                        warn!(dataset_id, error = %e, "Metadata queries failed, using manual catalog");
                        (fallback_catalog.to_vec(), SchemaSource::ManualCatalog)
                    }
                }
            }
        };

        let tables: Vec<TableSchema> = tables.into_iter().filter(TableSchema::is_usable).collect();
        debug!(count = tables.len(), ?source, "Schema discovery finished");
        Ok(DiscoveredSchema { tables, source })
    }

    async fn list_tables_direct(
        &self,
        token: &AccessToken,
        target: &ReportTarget,
        dataset_id: &str,
    ) -> BiResult<DirectListing> {
        let response = self
            .http
            .get(self.dataset_url(target, dataset_id, "tables"))
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| BiError::SchemaFailure(e.to_string()))?;

        let (status, body) = read_body(response)
            .await
            .map_err(|e| BiError::SchemaFailure(e.to_string()))?;

        if status == 404 && is_not_push_dataset(&body) {
            return Ok(DirectListing::NotPushDataset);
        }
        if !(200..300).contains(&status) {
            return Err(BiError::SchemaFailure(format!(
                "table listing returned HTTP {status}: {body}"
            )));
        }

        let list: TableList = serde_json::from_str(&body)
            .map_err(|e| BiError::SchemaFailure(format!("table listing decode: {e}")))?;

        Ok(DirectListing::Tables(
            list.value
                .into_iter()
                .filter(|table| !table.is_hidden)
                .map(|table| TableSchema {
                    name: table.name,
                    columns: table
                        .columns
                        .into_iter()
                        .filter(|c| !c.is_hidden)
                        .map(|c| c.name)
                        .collect(),
                })
                .collect(),
        ))
    }

    async fn query_schema_metadata(
        &self,
        token: &AccessToken,
        target: &ReportTarget,
        dataset_id: &str,
    ) -> BiResult<Vec<TableSchema>> {
        let table_rows = self
            .execute_query(token, target, dataset_id, TABLES_METADATA_QUERY)
            .await?;
        let column_rows = self
            .execute_query(token, target, dataset_id, COLUMNS_METADATA_QUERY)
            .await?;
        Ok(group_columns(&table_rows, &column_rows))
    }
}

/// Whether a 404 body says the dataset does not support direct listing
fn is_not_push_dataset(body: &str) -> bool {
    let normalized = body.to_lowercase().replace('-', " ");
    normalized.contains("not push api dataset") || normalized.contains("not a push api dataset")
}

/// First non-empty value among `keys`, rendered as a string
fn first_non_empty(row: &QueryRow, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match row.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Group INFO column rows by owning table, deduplicating column names
///
/// Tables keep the order of `table_rows`; tables only seen through column
/// rows are appended in first-seen order.
#[must_use]
pub fn group_columns(table_rows: &[QueryRow], column_rows: &[QueryRow]) -> Vec<TableSchema> {
    let mut tables: Vec<TableSchema> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();
    let mut name_by_id: HashMap<String, String> = HashMap::new();

    for row in table_rows {
        let Some(name) = first_non_empty(row, TABLE_NAME_KEYS) else {
            continue;
        };
        if let Some(id) = first_non_empty(row, TABLE_ID_KEYS) {
            name_by_id.insert(id, name.clone());
        }
        if !index_by_name.contains_key(&name) {
            index_by_name.insert(name.clone(), tables.len());
            tables.push(TableSchema::new(name, Vec::<String>::new()));
        }
    }

    for row in column_rows {
        let table_name = first_non_empty(row, COLUMN_TABLE_KEYS).or_else(|| {
            first_non_empty(row, TABLE_ID_KEYS).and_then(|id| name_by_id.get(&id).cloned())
        });
        let (Some(table_name), Some(column)) =
            (table_name, first_non_empty(row, COLUMN_NAME_KEYS))
        else {
            continue;
        };
        if column.starts_with(ROW_NUMBER_PREFIX) {
            continue;
        }

        let index = *index_by_name.entry(table_name.clone()).or_insert_with(|| {
            tables.push(TableSchema::new(table_name, Vec::<String>::new()));
            tables.len() - 1
        });
        let columns = &mut tables[index].columns;
        if !columns.contains(&column) {
            columns.push(column);
        }
    }

    tables
}
