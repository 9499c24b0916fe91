// ABOUTME: Environment variable parsing into typed, immutable server configuration
// ABOUTME: Covers HTTP, logging, Azure OpenAI completion, and Power BI pipeline settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! Environment-based configuration
//!
//! Blank values are treated as unset. Optional groups (the completion
//! endpoint, the Power BI credential, the report target) resolve to `None`
//! as a whole when any of their required members is missing, so callers can
//! skip the feature without attempting partial work.

use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

use tracing::info;

use crate::{
    constants::{endpoints, export, server},
    errors::{AppError, AppResult, BiError, BiResult},
    models::TableSchema,
};

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Inbound HTTP and outbound client settings
    pub http: HttpServerConfig,
    /// Log output settings
    pub logging: LoggingConfig,
    /// Azure `OpenAI` chat completion settings, `None` when incomplete
    pub completion: Option<CompletionConfig>,
    /// Power BI context pipeline settings
    pub powerbi: PowerBiConfig,
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Listening port
    pub port: u16,
    /// Timeout applied to every outbound request
    pub client_timeout: Duration,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: server::DEFAULT_HTTP_PORT,
            client_timeout: Duration::from_secs(server::DEFAULT_CLIENT_TIMEOUT_SECS),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parse from a string parameter (case-insensitive), defaulting to `Pretty`
    #[must_use]
    pub fn from_str_param(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Pretty,
        }
    }
}

/// Azure `OpenAI` deployment used for chat completions
#[derive(Clone)]
pub struct CompletionConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    /// Deployment name
    pub deployment: String,
    /// API version query parameter
    pub api_version: String,
    /// API key sent in the `api-key` header
    pub api_key: String,
}

impl fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Service-principal credential for the client-credentials grant
#[derive(Clone)]
pub struct Credential {
    /// Directory tenant
    pub tenant_id: String,
    /// Application (client) id
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
    /// Requested scope
    pub scope: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Workspace and report the pipeline samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTarget {
    /// Workspace (group) id
    pub workspace_id: String,
    /// Report id
    pub report_id: String,
}

/// A (page, visual) pair inside a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualRef {
    /// Page name (internal id, not display name)
    pub page: String,
    /// Visual name
    pub visual: String,
}

/// Bounded polling for export jobs
#[derive(Debug, Clone, Copy)]
pub struct ExportPollConfig {
    /// Maximum status fetches
    pub max_attempts: u32,
    /// Fixed delay between fetches
    pub interval: Duration,
}

impl Default for ExportPollConfig {
    fn default() -> Self {
        Self {
            max_attempts: export::POLL_ATTEMPTS,
            interval: Duration::from_millis(export::POLL_INTERVAL_MS),
        }
    }
}

/// Power BI context pipeline settings
#[derive(Debug, Clone)]
pub struct PowerBiConfig {
    /// Directory tenant
    pub tenant_id: Option<String>,
    /// Application (client) id
    pub client_id: Option<String>,
    /// Client secret
    pub client_secret: Option<String>,
    /// `OAuth2` scope
    pub scope: String,
    /// Workspace (group) id
    pub workspace_id: Option<String>,
    /// Report id
    pub report_id: Option<String>,
    /// Page override for the export tier
    pub page_name: Option<String>,
    /// Visual override for the export tier
    pub visual_name: Option<String>,
    /// Local CSV or JSON snapshot used as the last tier
    pub snapshot_path: Option<PathBuf>,
    /// Skip schema discovery and row sampling entirely
    pub sampling_disabled: bool,
    /// REST API base, including `/v1.0/myorg`
    pub api_base: String,
    /// Identity platform authority host
    pub authority_host: String,
    /// Export polling budget
    pub export_poll: ExportPollConfig,
    /// Schema used when live discovery is fully unavailable
    pub fallback_catalog: Vec<TableSchema>,
}

impl Default for PowerBiConfig {
    fn default() -> Self {
        Self {
            tenant_id: None,
            client_id: None,
            client_secret: None,
            scope: endpoints::POWERBI_SCOPE.to_owned(),
            workspace_id: None,
            report_id: None,
            page_name: None,
            visual_name: None,
            snapshot_path: None,
            sampling_disabled: false,
            api_base: endpoints::POWERBI_API_BASE.to_owned(),
            authority_host: endpoints::AUTHORITY_HOST.to_owned(),
            export_poll: ExportPollConfig::default(),
            fallback_catalog: default_fallback_catalog(),
        }
    }
}

impl PowerBiConfig {
    /// Credential, present only when tenant, client id and secret are all set
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        Some(Credential {
            tenant_id: self.tenant_id.clone()?,
            client_id: self.client_id.clone()?,
            client_secret: self.client_secret.clone()?,
            scope: self.scope.clone(),
        })
    }

    /// Report target, present only when workspace and report are both set
    #[must_use]
    pub fn report_target(&self) -> Option<ReportTarget> {
        Some(ReportTarget {
            workspace_id: self.workspace_id.clone()?,
            report_id: self.report_id.clone()?,
        })
    }

    /// Configured (page, visual) export override
    #[must_use]
    pub fn visual_override(&self) -> Option<VisualRef> {
        Some(VisualRef {
            page: self.page_name.clone()?,
            visual: self.visual_name.clone()?,
        })
    }

    /// Credential and report target needed before any network call
    ///
    /// # Errors
    ///
    /// Returns [`BiError::ConfigurationMissing`] naming the first absent group
    pub fn prerequisites(&self) -> BiResult<(Credential, ReportTarget)> {
        let credential = self.credential().ok_or(BiError::ConfigurationMissing(
            "tenant id, client id and client secret",
        ))?;
        let target = self
            .report_target()
            .ok_or(BiError::ConfigurationMissing("workspace id and report id"))?;
        Ok((credential, target))
    }

    /// Whether the mandatory prerequisite chain can run at all
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.prerequisites().is_ok()
    }
}

/// Single-table catalog shipped for when live schema discovery is unavailable
#[must_use]
pub fn default_fallback_catalog() -> Vec<TableSchema> {
    vec![TableSchema::new(
        "Vessel Calls",
        ["Date", "Terminal", "Vessel Name", "TEU Volume", "Berth Hours"],
    )]
}

impl ServerConfig {
    /// Load configuration from process environment
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a numeric or structured variable
    /// is present but cannot be parsed
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a numeric or structured variable
    /// is present but cannot be parsed
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(non_blank);

        let http = HttpServerConfig {
            port: parse_or(&get, "HTTP_PORT", server::DEFAULT_HTTP_PORT)?,
            client_timeout: Duration::from_secs(parse_or(
                &get,
                "HTTP_CLIENT_TIMEOUT_SECS",
                server::DEFAULT_CLIENT_TIMEOUT_SECS,
            )?),
        };

        let logging = LoggingConfig {
            level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_owned()),
            format: get("LOG_FORMAT").map_or(LogFormat::Pretty, |v| LogFormat::from_str_param(&v)),
        };

        let completion = match (
            get("AZURE_OPENAI_ENDPOINT"),
            get("AZURE_OPENAI_DEPLOYMENT"),
            get("AZURE_OPENAI_API_KEY"),
        ) {
            (Some(endpoint), Some(deployment), Some(api_key)) => Some(CompletionConfig {
                endpoint: endpoint.trim_end_matches('/').to_owned(),
                deployment,
                api_version: get("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| endpoints::AZURE_OPENAI_API_VERSION.to_owned()),
                api_key,
            }),
            _ => None,
        };

        let fallback_catalog = match get("POWERBI_FALLBACK_TABLE") {
            Some(raw) => vec![parse_fallback_table(&raw)?],
            None => default_fallback_catalog(),
        };

        let powerbi = PowerBiConfig {
            tenant_id: get("TENANT_ID"),
            client_id: get("CLIENT_ID"),
            client_secret: get("CLIENT_SECRET"),
            scope: get("POWERBI_SCOPE").unwrap_or_else(|| endpoints::POWERBI_SCOPE.to_owned()),
            workspace_id: get("WORKSPACE_ID"),
            report_id: get("REPORT_ID"),
            page_name: get("POWERBI_PAGE_NAME"),
            visual_name: get("POWERBI_VISUAL_NAME"),
            snapshot_path: get("POWERBI_SNAPSHOT_PATH").map(PathBuf::from),
            sampling_disabled: get("POWERBI_DISABLE_SAMPLING").is_some_and(|v| parse_flag(&v)),
            api_base: get("POWERBI_API_BASE")
                .unwrap_or_else(|| endpoints::POWERBI_API_BASE.to_owned())
                .trim_end_matches('/')
                .to_owned(),
            authority_host: get("AZURE_AUTHORITY_HOST")
                .unwrap_or_else(|| endpoints::AUTHORITY_HOST.to_owned())
                .trim_end_matches('/')
                .to_owned(),
            export_poll: ExportPollConfig {
                max_attempts: parse_or(&get, "POWERBI_EXPORT_POLL_ATTEMPTS", export::POLL_ATTEMPTS)?,
                interval: Duration::from_millis(parse_or(
                    &get,
                    "POWERBI_EXPORT_POLL_INTERVAL_MS",
                    export::POLL_INTERVAL_MS,
                )?),
            },
            fallback_catalog,
        };

        Ok(Self {
            http,
            logging,
            completion,
            powerbi,
        })
    }

    /// Log a redacted summary of the effective configuration
    pub fn log_summary(&self) {
        info!(
            port = self.http.port,
            completion_configured = self.completion.is_some(),
            powerbi_configured = self.powerbi.is_configured(),
            sampling_disabled = self.powerbi.sampling_disabled,
            visual_override = self.powerbi.visual_override().is_some(),
            snapshot = self.powerbi.snapshot_path.is_some(),
            "Server configuration loaded"
        );
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key).map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|e| AppError::config(format!("Invalid value for {key}: {e}")))
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse `Name=col1,col2,...` into a table schema
fn parse_fallback_table(raw: &str) -> AppResult<TableSchema> {
    let invalid = || {
        AppError::config("POWERBI_FALLBACK_TABLE must look like `Table=Column1,Column2`")
    };
    let (name, columns) = raw.split_once('=').ok_or_else(invalid)?;
    let name = name.trim();
    let columns: Vec<&str> = columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if name.is_empty() || columns.is_empty() {
        return Err(invalid());
    }
    Ok(TableSchema::new(name, columns))
}
