// ABOUTME: Liveness route reporting service identity and configuration readiness
// ABOUTME: Never calls upstream services, so it stays cheap for load balancer probes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{constants::service, resources::ServerResources};

/// Health response body
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests
    pub status: String,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Power BI credential and report are configured
    pub bi_configured: bool,
    /// Completion endpoint is configured
    pub completion_configured: bool,
}

/// Health check routes
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create health routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::health))
            .with_state(resources)
    }

    async fn health(State(resources): State<Arc<ServerResources>>) -> Json<HealthResponse> {
        Json(HealthResponse {
            status: "ok".to_owned(),
            service: service::NAME.to_owned(),
            version: service::VERSION.to_owned(),
            bi_configured: resources.config.powerbi.is_configured(),
            completion_configured: resources.completion.is_some(),
        })
    }
}
