// ABOUTME: Unified error types for the BI context pipeline and the HTTP surface
// ABOUTME: Maps pipeline failures to a typed taxonomy and HTTP errors to JSON responses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! # Error Handling
//!
//! Two layers of errors live here:
//!
//! - [`BiError`] covers everything that can go wrong while acquiring report
//!   context. These errors never reach the end user; the context assembler
//!   logs them and moves on to the next fallback tier.
//! - [`AppError`] is what HTTP handlers return. It renders as
//!   `{"error": ...}` or `{"error": ..., "detail": ...}` with a status code
//!   derived from its [`ErrorCode`].

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Result alias for HTTP-facing operations
pub type AppResult<T> = Result<T, AppError>;

/// Result alias for BI pipeline operations
pub type BiResult<T> = Result<T, BiError>;

/// Failures raised inside the context-acquisition pipeline
#[derive(Debug, Error)]
pub enum BiError {
    /// A required configuration value is absent
    #[error("configuration missing: {0}")]
    ConfigurationMissing(&'static str),

    /// Client-credentials exchange was rejected
    #[error("token exchange failed with HTTP {status}: {body}")]
    AuthFailure {
        /// Upstream HTTP status
        status: u16,
        /// Upstream response body
        body: String,
    },

    /// Report metadata could not be fetched
    #[error("report metadata request failed with HTTP {status}: {detail}")]
    MetadataFailure {
        /// Upstream HTTP status
        status: u16,
        /// Upstream response body or reason
        detail: String,
    },

    /// Schema listing or metadata query failed
    #[error("schema discovery failed: {0}")]
    SchemaFailure(String),

    /// A DAX query against a dataset was rejected
    #[error("dataset query failed with HTTP {status}: {body}")]
    QueryFailure {
        /// Upstream HTTP status
        status: u16,
        /// Upstream response body
        body: String,
    },

    /// Export job could not be submitted
    #[error("export submission failed with HTTP {status}: {body}")]
    ExportSubmitFailure {
        /// Upstream HTTP status
        status: u16,
        /// Upstream response body or reason
        body: String,
    },

    /// Export job reached a failed or cancelled state
    #[error("export job ended in a terminal failure state: {payload}")]
    ExportFailure {
        /// Full status payload returned by the poll endpoint
        payload: Value,
    },

    /// Export artifact download failed
    #[error("export download failed with HTTP {status}: {body}")]
    DownloadFailure {
        /// Upstream HTTP status
        status: u16,
        /// Upstream response body
        body: String,
    },

    /// Local snapshot file could not be read or parsed
    #[error("snapshot unavailable: {0}")]
    SnapshotFailure(String),

    /// Transport-level failure talking to an upstream service
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream returned a body that does not decode
    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Upstream returned a location that is not a valid URL
    #[error("invalid upstream url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Stable error codes exposed to HTTP clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Request body is malformed or missing required fields
    InvalidInput,
    /// Server-side configuration required for the request is missing
    ConfigMissing,
    /// An upstream service returned an error
    ExternalServiceError,
    /// Unexpected internal failure
    InternalError,
}

impl ErrorCode {
    /// HTTP status associated with this code
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::ConfigMissing | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ExternalServiceError => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short machine-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::ConfigMissing => "config_missing",
            Self::ExternalServiceError => "external_service_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by HTTP handlers
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct AppError {
    /// Error classification
    pub code: ErrorCode,
    /// Human-readable message, returned as `error`
    pub message: String,
    /// Optional detail, returned as `detail`
    pub detail: Option<String>,
}

impl AppError {
    /// Create a new error with an explicit code
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach a detail string
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Malformed or incomplete request
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Server configuration required for this request is missing
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigMissing, message)
    }

    /// Upstream service failure, `detail` carries the upstream body
    #[must_use]
    pub fn external_service(service: &str, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{service} request failed"),
        )
        .with_detail(detail)
    }

    /// Unexpected internal failure
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, "Internal server error").with_detail(detail)
    }

    /// HTTP status for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = self.detail.map_or_else(
            || json!({ "error": self.message }),
            |detail| json!({ "error": self.message, "detail": detail }),
        );
        (status, Json(body)).into_response()
    }
}
