// ABOUTME: Chat route handler that grounds conversations in live Power BI context
// ABOUTME: Validates the request, assembles BI context, and forwards to the completion service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! Chat route
//!
//! `POST /api/chat` accepts `{ "messages": [{ "role", "content" }, ...] }`
//! and answers `{ "reply": "..." }`. BI context is best-effort: any failure
//! acquiring it degrades to a plain completion without it.

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    context::ContextAssembler,
    errors::{AppError, AppResult},
    llm::{build_llm_messages, IncomingMessage},
    resources::ServerResources,
};

/// Chat request body
#[derive(Debug, Deserialize, Serialize)]
pub struct ChatRequest {
    /// Conversation so far, oldest first
    #[serde(default)]
    pub messages: Option<Vec<IncomingMessage>>,
}

/// Chat response body
#[derive(Debug, Deserialize, Serialize)]
pub struct ChatReply {
    /// Assistant reply
    pub reply: String,
}

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create chat routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chat", post(Self::send_message))
            .with_state(resources)
    }

    async fn send_message(
        State(resources): State<Arc<ServerResources>>,
        payload: Result<Json<ChatRequest>, JsonRejection>,
    ) -> AppResult<Json<ChatReply>> {
        let started = Instant::now();

        let Json(request) = payload
            .map_err(|e| AppError::invalid_input(format!("Invalid JSON body: {}", e.body_text())))?;
        let messages = request
            .messages
            .filter(|messages| !messages.is_empty())
            .ok_or_else(|| AppError::invalid_input("`messages` must be a non-empty array"))?;

        let Some(completion) = resources.completion.as_ref() else {
            return Err(AppError::config("Completion service is not configured"));
        };

        let context = ContextAssembler::new(&resources.powerbi, &resources.config.powerbi)
            .assemble()
            .await;

        let outbound = build_llm_messages(context.as_ref(), &messages);
        let reply = completion.complete(&outbound).await?;

        info!(
            messages = messages.len(),
            bi_context = context.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Chat completion served"
        );

        Ok(Json(ChatReply { reply }))
    }
}
