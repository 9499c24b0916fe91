// ABOUTME: Application constants for upstream endpoints, sampling caps, and completion parameters
// ABOUTME: Centralizes every tunable default so modules never embed magic numbers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! Application constants

/// Service identity reported by the health route
pub mod service {
    /// Service name
    pub const NAME: &str = "powerbi-chat-bridge";
    /// Crate version
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Default upstream endpoints
pub mod endpoints {
    /// Power BI REST API base, including the `myorg` scope
    pub const POWERBI_API_BASE: &str = "https://api.powerbi.com/v1.0/myorg";
    /// Microsoft identity platform authority host
    pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
    /// `OAuth2` scope granting Power BI API access
    pub const POWERBI_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";
    /// Azure `OpenAI` API version used when none is configured
    pub const AZURE_OPENAI_API_VERSION: &str = "2025-01-01-preview";
}

/// Limits that keep the injected context bounded
pub mod sampling {
    /// Tables sampled per run
    pub const MAX_TABLES: usize = 3;
    /// Columns selected per sampled table
    pub const MAX_COLUMNS: usize = 5;
    /// Rows requested by the `TOPN` sample query
    pub const QUERY_ROW_LIMIT: usize = 10;
    /// Dataset rows rendered per table
    pub const DATASET_ROW_CAP: usize = 5;
    /// Rows rendered from a JSON snapshot
    pub const JSON_ROW_CAP: usize = 10;
    /// Data lines kept from CSV content (export artifacts and snapshots)
    pub const CSV_LINE_CAP: usize = 15;
    /// Characters kept when a JSON snapshot cannot be normalized to rows
    pub const RAW_PREVIEW_CHARS: usize = 2000;
    /// Report pages scanned for a table-like visual
    pub const MAX_SCANNED_PAGES: usize = 3;
}

/// Export job polling defaults
pub mod export {
    /// Poll attempts before giving up on an export job
    pub const POLL_ATTEMPTS: u32 = 10;
    /// Delay between polls in milliseconds
    pub const POLL_INTERVAL_MS: u64 = 3000;
}

/// Fixed sampling parameters sent to the completion endpoint
pub mod completion {
    /// Sampling temperature
    pub const TEMPERATURE: f32 = 0.7;
    /// Maximum completion tokens
    pub const MAX_TOKENS: u32 = 800;
    /// Nucleus sampling
    pub const TOP_P: f32 = 0.95;
}

/// HTTP server defaults
pub mod server {
    /// Port when `HTTP_PORT` is unset
    pub const DEFAULT_HTTP_PORT: u16 = 8081;
    /// Outbound request timeout when `HTTP_CLIENT_TIMEOUT_SECS` is unset
    pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 30;
    /// Maximum accepted chat request body
    pub const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;
}
