// ABOUTME: Tracing subscriber initialization for structured application logging
// ABOUTME: Honors RUST_LOG first, then the configured level, in pretty or JSON output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::{
    config::{LogFormat, LoggingConfig},
    errors::{AppError, AppResult},
};

/// Install the global tracing subscriber
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init_logging(config: &LoggingConfig) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AppError::config(format!("Invalid log filter: {e}")))?;

    let registry = Registry::default().with(filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    result.map_err(|e| AppError::internal(format!("Failed to initialize logging: {e}")))
}
