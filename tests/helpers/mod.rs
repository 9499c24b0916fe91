// ABOUTME: Test helper modules shared across integration test binaries
// ABOUTME: Provides in-process request helpers for axum routers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

pub mod axum_test;
