// ABOUTME: Server binary entry point for the Power BI chat bridge
// ABOUTME: Loads environment configuration, initializes logging, and serves HTTP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! # BI Chat Server
//!
//! ## Usage
//!
//! ```bash
//! # Serve on the port from HTTP_PORT (default 8081)
//! cargo run --bin bi-chat-server
//!
//! # Override port and log format
//! cargo run --bin bi-chat-server -- --port 9000 --log-format json
//! ```

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use powerbi_chat_bridge::{
    config::{LogFormat, ServerConfig},
    constants::service,
    logging::init_logging,
    resources::ServerResources,
    server,
};

#[derive(Parser)]
#[command(
    name = "bi-chat-server",
    about = "Chat completion gateway grounded in live Power BI data",
    long_about = "Serves POST /api/chat, injecting a bounded Power BI data sample into each conversation"
)]
struct ServerArgs {
    /// Listening port (overrides HTTP_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Log output format: pretty or json (overrides LOG_FORMAT)
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(format) = args.log_format.as_deref() {
        config.logging.format = LogFormat::from_str_param(format);
    }

    init_logging(&config.logging)?;
    info!(version = service::VERSION, "=== {} ===", service::NAME);
    config.log_summary();

    let resources = Arc::new(ServerResources::new(config)?);
    server::run(resources).await?;

    info!("Server stopped");
    Ok(())
}
