// ABOUTME: Azure OpenAI chat completions client with fixed sampling parameters
// ABOUTME: Converts upstream failures into 502-class errors carrying the upstream body
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ChatMessage;
use crate::{
    config::CompletionConfig,
    constants::completion,
    errors::{AppError, AppResult},
};

const SERVICE_NAME: &str = "Completion service";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat completions against one Azure `OpenAI` deployment
#[derive(Debug, Clone)]
pub struct AzureOpenAiClient {
    http: Client,
    config: CompletionConfig,
}

impl AzureOpenAiClient {
    /// Create a client sharing the given HTTP connection pool
    #[must_use]
    pub fn new(http: Client, config: CompletionConfig) -> Self {
        Self { http, config }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.config.endpoint,
            urlencoding::encode(&self.config.deployment)
        )
    }

    /// Request a completion and return the first choice's text
    ///
    /// # Errors
    ///
    /// Returns an external-service error when the endpoint is unreachable,
    /// answers non-2xx, or returns no message content
    pub async fn complete(&self, messages: &[ChatMessage]) -> AppResult<String> {
        let request = CompletionRequest {
            messages,
            temperature: completion::TEMPERATURE,
            max_tokens: completion::MAX_TOKENS,
            top_p: completion::TOP_P,
        };

        let response = self
            .http
            .post(self.completions_url())
            .query(&[("api-version", self.config.api_version.as_str())])
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::external_service(SERVICE_NAME, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::external_service(SERVICE_NAME, e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Completion request failed");
            return Err(AppError::external_service(SERVICE_NAME, body));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::external_service(SERVICE_NAME, format!("JSON parse error: {e}"))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                AppError::external_service(SERVICE_NAME, "response contained no message content")
            })?;

        debug!(chars = content.len(), "Received completion");
        Ok(content)
    }
}
