// ABOUTME: HTTP server assembly: router, tower middleware stack, and serve loop
// ABOUTME: Adds request tracing, CORS, body limits, and panic-to-500 conversion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

use std::{any::Any, net::SocketAddr, sync::Arc};

use axum::{
    response::{IntoResponse, Response},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::{
    constants::server,
    errors::{AppError, AppResult},
    resources::ServerResources,
    routes::{ChatRoutes, HealthRoutes},
};

/// Build the full application router
#[must_use]
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(HealthRoutes::routes(Arc::clone(&resources)))
        .merge(ChatRoutes::routes(resources))
        .layer(RequestBodyLimitLayer::new(server::MAX_REQUEST_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| (*s).to_owned()))
        .unwrap_or_else(|| "handler panicked".to_owned());
    error!(detail = %detail, "Request handler panicked");
    AppError::internal(detail).into_response()
}

/// Bind and serve until Ctrl-C or SIGTERM
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails
pub async fn run(resources: Arc<ServerResources>) -> AppResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], resources.config.http.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    info!(%addr, "HTTP server listening");
    axum::serve(listener, build_router(resources))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
