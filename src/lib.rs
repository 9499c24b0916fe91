// ABOUTME: Main library entry point for the Power BI chat bridge
// ABOUTME: Grounds chat completions in live report data through a tiered fallback pipeline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

#![deny(unsafe_code)]

//! # Power BI Chat Bridge
//!
//! An HTTP service that forwards a chat conversation to an Azure `OpenAI`
//! deployment after injecting a bounded sample of live Power BI data.
//!
//! ## Context Pipeline
//!
//! Each chat request runs the tiers below strictly in order and stops at the
//! first one that yields data:
//!
//! - **Prerequisites**: client-credentials token exchange and report
//!   resolution. Failure here means the request proceeds without context.
//! - **Dataset sample**: schema discovery (direct listing, `INFO.*`
//!   metadata queries, then a manual catalog) followed by `TOPN` sampling.
//! - **Visual export**: CSV export of a table-like visual through the
//!   asynchronous export job protocol.
//! - **Snapshot**: a local CSV or JSON file.
//!
//! No tier failure ever fails the chat request; only the completion call
//! itself can.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use powerbi_chat_bridge::config::ServerConfig;
//! use powerbi_chat_bridge::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Chat bridge configured on port {}", config.http.port);
//!     Ok(())
//! }
//! ```

/// Environment-driven configuration
pub mod config;

/// Application constants and defaults
pub mod constants;

/// Context assembler over the acquisition tiers
pub mod context;

/// Error taxonomy and HTTP error responses
pub mod errors;

/// LLM completion gateway
pub mod llm;

/// Tracing subscriber setup
pub mod logging;

/// Report, schema and context data models
pub mod models;

/// Power BI REST API client
pub mod powerbi;

/// Shared server resources
pub mod resources;

/// HTTP routes
pub mod routes;

/// Router assembly and serve loop
pub mod server;

/// Local snapshot loader and text summarizers
pub mod snapshot;
