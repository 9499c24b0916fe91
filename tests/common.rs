// ABOUTME: Shared test utilities: scripted mock upstream and configuration builders
// ABOUTME: Plays the identity service, Power BI REST API, and Azure OpenAI on one local port
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
#![allow(dead_code, clippy::missing_panics_doc, clippy::must_use_candidate)]
//! Shared test utilities for `powerbi_chat_bridge`
//!
//! [`MockUpstream`] serves every upstream endpoint the pipeline talks to from
//! a single `axum` router on an ephemeral port. Responses come from a
//! [`MockScript`] the test can edit, and every request is recorded in order
//! so tests can assert which calls happened and which did not.

use std::{
    collections::{HashMap, VecDeque},
    path::PathBuf,
    sync::{Arc, Mutex, Once},
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use powerbi_chat_bridge::{
    config::{
        CompletionConfig, ExportPollConfig, HttpServerConfig, LoggingConfig, PowerBiConfig,
        ServerConfig,
    },
    models::TableSchema,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const TENANT: &str = "tenant-1";
pub const WORKSPACE: &str = "ws-1";
pub const REPORT: &str = "report-1";
pub const DATASET: &str = "dataset-1";
pub const DEPLOYMENT: &str = "gpt-test";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet test logging once per test binary
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("warn")
            .with_test_writer()
            .try_init();
    });
}

/// Canned upstream behaviour, editable per test
#[derive(Debug, Clone)]
pub struct MockScript {
    pub token_status: u16,
    pub token_body: Value,
    pub report_status: u16,
    pub report_body: Value,
    pub tables_status: u16,
    pub tables_body: Value,
    /// `INFO.TABLES()` rows, or `None` to answer 400
    pub info_tables: Option<Vec<Value>>,
    /// `INFO.COLUMNS()` rows, or `None` to answer 400
    pub info_columns: Option<Vec<Value>>,
    /// `TOPN` sample rows keyed by quoted table name, e.g. `'Sales'`
    pub sample_rows: HashMap<String, Vec<Value>>,
    pub pages: Vec<Value>,
    /// Visuals keyed by page name; missing pages answer 404
    pub visuals: HashMap<String, Vec<Value>>,
    pub export_submit_status: u16,
    pub export_location: bool,
    /// Status payloads returned by successive polls; the last one repeats
    pub export_statuses: VecDeque<Value>,
    pub export_file_status: u16,
    pub export_file: String,
    pub completion_status: u16,
    pub completion_body: Value,
}

impl Default for MockScript {
    fn default() -> Self {
        let mut sample_rows = HashMap::new();
        sample_rows.insert(
            "'Sales'".to_owned(),
            vec![
                json!({"Sales[Region]": "East", "Sales[Amount]": 120}),
                json!({"Sales[Region]": "West", "Sales[Amount]": null}),
            ],
        );

        Self {
            token_status: 200,
            token_body: json!({"access_token": "test-token", "token_type": "Bearer"}),
            report_status: 200,
            report_body: json!({"id": REPORT, "name": "Port Operations", "datasetId": DATASET}),
            tables_status: 200,
            tables_body: json!({"value": [
                {"name": "Sales", "columns": [{"name": "Region"}, {"name": "Amount"}]},
                {"name": "Hidden", "isHidden": true, "columns": [{"name": "Secret"}]},
                {"name": "Empty", "columns": []}
            ]}),
            info_tables: None,
            info_columns: None,
            sample_rows,
            pages: vec![json!({"name": "page-1", "displayName": "Overview"})],
            visuals: HashMap::from([(
                "page-1".to_owned(),
                vec![
                    json!({"name": "card-1", "type": "card"}),
                    json!({"name": "table-1", "type": "tableEx", "title": "Calls"}),
                ],
            )]),
            export_submit_status: 202,
            export_location: true,
            export_statuses: VecDeque::from([json!({"id": "job-1", "status": "Running"})]),
            export_file_status: 200,
            export_file: "Terminal,Calls\nT1,12\nT2,7\n".to_owned(),
            completion_status: 200,
            completion_body: json!({"choices": [{"message": {"role": "assistant", "content": "Here is your answer."}}]}),
        }
    }
}

/// A recorded upstream request
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub script: Mutex<MockScript>,
    pub requests: Mutex<Vec<RecordedRequest>>,
    base_url: Mutex<String>,
}

/// Running mock upstream
pub struct MockUpstream {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockUpstream {
    /// Start a mock upstream with the default script
    pub async fn start() -> Self {
        Self::start_with(MockScript::default()).await
    }

    /// Start a mock upstream with a custom script
    pub async fn start_with(script: MockScript) -> Self {
        init_test_logging();

        let state = Arc::new(MockState {
            script: Mutex::new(script),
            ..MockState::default()
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        *state.base_url.lock().unwrap() = base_url.clone();

        let app = Router::new()
            .fallback(handle_upstream)
            .with_state(Arc::clone(&state));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { base_url, state }
    }

    /// Edit the script in place
    pub fn script(&self, edit: impl FnOnce(&mut MockScript)) {
        edit(&mut self.state.script.lock().unwrap());
    }

    /// All recorded requests, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Number of recorded requests whose path contains `fragment`
    pub fn count(&self, fragment: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path.contains(fragment))
            .count()
    }

    /// Recorded request bodies for paths containing `fragment`
    pub fn bodies(&self, fragment: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.contains(fragment))
            .map(|r| r.body)
            .collect()
    }

    /// Power BI settings pointing at this mock, fully configured
    pub fn powerbi_config(&self) -> PowerBiConfig {
        PowerBiConfig {
            tenant_id: Some(TENANT.to_owned()),
            client_id: Some("client-1".to_owned()),
            client_secret: Some("secret-1".to_owned()),
            workspace_id: Some(WORKSPACE.to_owned()),
            report_id: Some(REPORT.to_owned()),
            api_base: format!("{}/v1.0/myorg", self.base_url),
            authority_host: self.base_url.clone(),
            export_poll: ExportPollConfig {
                max_attempts: 5,
                interval: Duration::ZERO,
            },
            fallback_catalog: vec![TableSchema::new("Manual", ["Day", "Count"])],
            ..PowerBiConfig::default()
        }
    }

    /// Completion settings pointing at this mock
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            endpoint: self.base_url.clone(),
            deployment: DEPLOYMENT.to_owned(),
            api_version: "2025-01-01-preview".to_owned(),
            api_key: "test-api-key".to_owned(),
        }
    }

    /// Full server configuration pointing at this mock
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            http: HttpServerConfig {
                port: 0,
                client_timeout: Duration::from_secs(5),
            },
            logging: LoggingConfig::default(),
            completion: Some(self.completion_config()),
            powerbi: self.powerbi_config(),
        }
    }
}

/// Write a snapshot file into a temp dir and return its path
pub fn write_snapshot(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn json_response(status: u16, body: &Value) -> Response {
    (
        StatusCode::from_u16(status).unwrap(),
        Json(body.clone()),
    )
        .into_response()
}

fn query_response(rows: Option<&Vec<Value>>) -> Response {
    rows.map_or_else(
        || json_response(400, &json!({"error": {"code": "DatasetExecuteQueriesError"}})),
        |rows| json_response(200, &json!({"results": [{"tables": [{"rows": rows}]}]})),
    )
}

async fn handle_upstream(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let path = uri.path().to_owned();
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        body: body.clone(),
    });

    let mut script = state.script.lock().unwrap();
    let base_url = state.base_url.lock().unwrap().clone();
    let group = format!("/v1.0/myorg/groups/{WORKSPACE}");
    let report = format!("{group}/reports/{REPORT}");

    if path == format!("/{TENANT}/oauth2/v2.0/token") {
        return json_response(script.token_status, &script.token_body);
    }
    if path == report {
        return json_response(script.report_status, &script.report_body);
    }
    if path == format!("{group}/datasets/{DATASET}/tables") {
        return json_response(script.tables_status, &script.tables_body);
    }
    if path == format!("{group}/datasets/{DATASET}/executeQueries") {
        let query = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["queries"][0]["query"].as_str().map(str::to_owned))
            .unwrap_or_default();
        if query.contains("INFO.TABLES") {
            return query_response(script.info_tables.as_ref());
        }
        if query.contains("INFO.COLUMNS") {
            return query_response(script.info_columns.as_ref());
        }
        let rows = script
            .sample_rows
            .iter()
            .find(|(table, _)| query.contains(&format!("SUMMARIZE({table}")))
            .map(|(_, rows)| rows);
        return query_response(rows);
    }
    if path == format!("{report}/pages") {
        return json_response(200, &json!({"value": script.pages}));
    }
    if let Some(page) = path
        .strip_prefix(&format!("{report}/pages/"))
        .and_then(|rest| rest.strip_suffix("/visuals"))
    {
        return script.visuals.get(page).map_or_else(
            || json_response(404, &json!({"error": "page not found"})),
            |visuals| json_response(200, &json!({"value": visuals})),
        );
    }
    if path == format!("{report}/ExportTo") {
        let mut response = json_response(
            script.export_submit_status,
            &json!({"id": "job-1", "status": "NotStarted"}),
        );
        if script.export_location {
            response.headers_mut().insert(
                header::LOCATION,
                format!("{base_url}/exports/job-1").parse().unwrap(),
            );
        }
        return response;
    }
    if path == "/exports/job-1" {
        let status = if script.export_statuses.len() > 1 {
            script.export_statuses.pop_front().unwrap()
        } else {
            script.export_statuses.front().cloned().unwrap_or(Value::Null)
        };
        return json_response(200, &status);
    }
    if path == "/files/job-1" {
        return (
            StatusCode::from_u16(script.export_file_status).unwrap(),
            script.export_file.clone(),
        )
            .into_response();
    }
    if path == format!("/openai/deployments/{DEPLOYMENT}/chat/completions") {
        return json_response(script.completion_status, &script.completion_body);
    }

    json_response(404, &json!({"error": format!("unmocked path {path}")}))
}
