// ABOUTME: Route module organization for the chat bridge HTTP endpoints
// ABOUTME: Groups route definitions by domain and re-exports their route builders
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! Route module
//!
//! Each domain module owns its route definitions and thin handlers that
//! delegate to the context pipeline and the completion gateway.

/// Chat completion route with BI context injection
pub mod chat;

/// Health check route
pub mod health;

pub use chat::ChatRoutes;
pub use health::HealthRoutes;
