// ABOUTME: Configuration module root for environment-driven server settings
// ABOUTME: Re-exports the immutable ServerConfig built once at process start
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! Configuration management
//!
//! All configuration comes from the environment and is read exactly once,
//! in [`environment::ServerConfig::from_env`]. The resulting value is passed
//! down explicitly; no module reads the environment on its own.

/// Environment-based configuration structures
pub mod environment;

pub use environment::{
    CompletionConfig, Credential, ExportPollConfig, HttpServerConfig, LogFormat, LoggingConfig,
    PowerBiConfig, ReportTarget, ServerConfig, VisualRef,
};
