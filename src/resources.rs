// ABOUTME: Shared server resources built once at startup and handed to every route
// ABOUTME: Holds immutable configuration and the upstream clients sharing one HTTP pool
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

use std::sync::Arc;

use reqwest::Client;

use crate::{
    config::ServerConfig,
    errors::{AppError, AppResult},
    llm::AzureOpenAiClient,
    powerbi::PowerBiClient,
};

/// Read-only state shared across requests
///
/// Nothing here is mutated after construction; per-request pipeline state
/// (tokens, schemas, export jobs) lives on the request's own stack.
#[derive(Debug, Clone)]
pub struct ServerResources {
    /// Effective configuration
    pub config: Arc<ServerConfig>,
    /// Power BI REST client
    pub powerbi: PowerBiClient,
    /// Completion client, `None` when the completion endpoint is unconfigured
    pub completion: Option<AzureOpenAiClient>,
}

impl ServerResources {
    /// Build resources from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn new(config: ServerConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(config.http.client_timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        let powerbi = PowerBiClient::new(http.clone(), &config.powerbi);
        let completion = config
            .completion
            .clone()
            .map(|completion| AzureOpenAiClient::new(http, completion));

        Ok(Self {
            config: Arc::new(config),
            powerbi,
            completion,
        })
    }
}
