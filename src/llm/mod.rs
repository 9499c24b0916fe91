// ABOUTME: Completion gateway types and outbound message assembly
// ABOUTME: Merges the BI context block with the caller's conversation for the LLM call
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! # LLM Completion Gateway
//!
//! Outbound message order is fixed:
//!
//! 1. the system persona ([`prompts::get_system_prompt`])
//! 2. the BI context block, when one was assembled
//! 3. the caller's conversation, verbatim, with roles normalized to
//!    `user` or `assistant`

/// Azure `OpenAI` chat completion client
pub mod azure;
/// System persona and context message text
pub mod prompts;

pub use azure::AzureOpenAiClient;
pub use prompts::get_system_prompt;

use serde::{Deserialize, Serialize};

use crate::models::ContextBlock;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions and injected context
    System,
    /// End user
    User,
    /// Model response
    Assistant,
}

impl MessageRole {
    /// Normalize a caller-supplied role: `assistant` stays, anything else is `user`
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("assistant") {
            Self::Assistant
        } else {
            Self::User
        }
    }
}

/// A message sent to the completion endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// User message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A message as received from the chat UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Free-form role; normalized before forwarding
    #[serde(default)]
    pub role: String,
    /// Message text
    #[serde(default)]
    pub content: String,
}

/// Build the outbound message list
#[must_use]
pub fn build_llm_messages(
    context: Option<&ContextBlock>,
    conversation: &[IncomingMessage],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(conversation.len() + 2);
    messages.push(ChatMessage::system(get_system_prompt()));

    if let Some(block) = context {
        messages.push(ChatMessage::system(prompts::context_message(block)));
    }

    messages.extend(conversation.iter().map(|msg| ChatMessage {
        role: MessageRole::normalize(&msg.role),
        content: msg.content.clone(),
    }));

    messages
}
