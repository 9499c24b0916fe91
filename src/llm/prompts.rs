// ABOUTME: Fixed system persona and the wrapper text for injected BI context
// ABOUTME: Keeps prompt wording in one place, separate from request plumbing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

use crate::models::ContextBlock;

const SYSTEM_PROMPT: &str = "You are a business intelligence assistant. \
Answer questions about the organization's operational data clearly and concisely. \
When live report data is provided, ground your answer in it and say which table or visual \
the figures come from. Sample data is truncated; do not present sampled rows as complete totals. \
If the data needed to answer is not available, say so instead of guessing.";

/// The fixed system persona
#[must_use]
pub const fn get_system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// Wrap a context block as the second system message
#[must_use]
pub fn context_message(block: &ContextBlock) -> String {
    format!(
        "Live data sampled from Power BI for this conversation:\n\n{}",
        block.render()
    )
}
