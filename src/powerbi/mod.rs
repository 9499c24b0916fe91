// ABOUTME: Power BI REST API client shared by every context acquisition tier
// ABOUTME: Owns URL construction, DAX query execution, and upstream response handling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! # Power BI Client
//!
//! A thin client over the Power BI REST API, split by concern:
//!
//! - [`auth`] - client-credentials token exchange
//! - [`reports`] - report metadata, pages and visuals
//! - [`schema`] - dataset table discovery with metadata-query fallback
//! - [`sampler`] - bounded `TOPN` row sampling
//! - [`export`] - asynchronous export job protocol
//!
//! The client holds no per-request state. Tokens and metadata are passed in
//! by the caller and discarded after each pipeline run.
//!
//! # API Reference
//! Power BI REST API: <https://learn.microsoft.com/rest/api/power-bi/>

/// Client-credentials token exchange
pub mod auth;
/// Asynchronous export job submission, polling and download
pub mod export;
/// Report metadata, page and visual listing
pub mod reports;
/// Row sampling queries and cell rendering
pub mod sampler;
/// Dataset schema discovery
pub mod schema;

pub use auth::AccessToken;
pub use export::{ExportJob, ExportStatus, PollState};
pub use reports::{ReportPage, ReportVisual};

use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

use crate::{
    config::{PowerBiConfig, ReportTarget},
    errors::{BiError, BiResult},
};

/// One row of a DAX query result, keyed by column reference
pub type QueryRow = Map<String, Value>;

/// Power BI REST API client
#[derive(Debug, Clone)]
pub struct PowerBiClient {
    http: Client,
    api_base: String,
    authority_host: String,
}

#[derive(Debug, Deserialize)]
struct ExecuteQueriesResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    tables: Vec<QueryTable>,
}

#[derive(Debug, Deserialize)]
struct QueryTable {
    #[serde(default)]
    rows: Vec<QueryRow>,
}

impl PowerBiClient {
    /// Create a client sharing the given HTTP connection pool
    #[must_use]
    pub fn new(http: Client, config: &PowerBiConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            authority_host: config.authority_host.trim_end_matches('/').to_owned(),
        }
    }

    /// URL of a resource under the report's workspace
    fn group_url(&self, target: &ReportTarget, path: &str) -> String {
        format!(
            "{}/groups/{}/{path}",
            self.api_base,
            urlencoding::encode(&target.workspace_id)
        )
    }

    /// URL of a resource under the configured report
    fn report_url(&self, target: &ReportTarget, path: &str) -> String {
        let report = format!("reports/{}", urlencoding::encode(&target.report_id));
        if path.is_empty() {
            self.group_url(target, &report)
        } else {
            self.group_url(target, &format!("{report}/{path}"))
        }
    }

    /// URL of a resource under a dataset
    fn dataset_url(&self, target: &ReportTarget, dataset_id: &str, path: &str) -> String {
        self.group_url(
            target,
            &format!("datasets/{}/{path}", urlencoding::encode(dataset_id)),
        )
    }

    /// Resolve an absolute or API-relative location returned by the service
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be parsed as a URL
    pub fn resolve_location(&self, location: &str) -> BiResult<Url> {
        match Url::parse(location) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse(&format!("{}/", self.api_base))?;
                Ok(base.join(location)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Run one DAX query against a dataset and return the first table's rows
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx response, or an
    /// undecodable body
    pub async fn execute_query(
        &self,
        token: &AccessToken,
        target: &ReportTarget,
        dataset_id: &str,
        dax: &str,
    ) -> BiResult<Vec<QueryRow>> {
        let response = self
            .http
            .post(self.dataset_url(target, dataset_id, "executeQueries"))
            .bearer_auth(token.secret())
            .json(&json!({
                "queries": [{ "query": dax }],
                "serializerSettings": { "includeNulls": true }
            }))
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        if !(200..300).contains(&status) {
            return Err(BiError::QueryFailure { status, body });
        }

        let parsed: ExecuteQueriesResponse = serde_json::from_str(&body)?;
        Ok(parsed
            .results
            .into_iter()
            .next()
            .and_then(|result| result.tables.into_iter().next())
            .map(|table| table.rows)
            .unwrap_or_default())
    }
}

/// Drain a response into its status code and text body
async fn read_body(response: Response) -> BiResult<(u16, String)> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok((status, body))
}

/// Parse a JSON body, treating an empty body as `null`
fn parse_json_body(body: &str) -> BiResult<Value> {
    if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        Ok(serde_json::from_str(body)?)
    }
}
