// ABOUTME: Minimal request builder that drives an axum Router without binding a port
// ABOUTME: Wraps tower oneshot and exposes status and JSON accessors on the response
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(dead_code, clippy::missing_panics_doc, clippy::must_use_candidate)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;

/// In-flight test request
pub struct AxumTestRequest {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Body,
}

impl AxumTestRequest {
    fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_owned(),
            headers: Vec::new(),
            body: Body::empty(),
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Serialize `body` as JSON and set the content type
    pub fn json<T: Serialize>(self, body: &T) -> Self {
        let bytes = serde_json::to_vec(body).unwrap();
        self.raw_body(bytes)
            .header(header::CONTENT_TYPE.as_str(), "application/json")
    }

    /// Send raw bytes without touching headers
    pub fn raw_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub async fn send(self, router: Router) -> AxumTestResponse {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request = builder.body(self.body).unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status().as_u16();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        AxumTestResponse {
            status,
            body: bytes.to_vec(),
        }
    }
}

/// Buffered response
pub struct AxumTestResponse {
    status: u16,
    body: Vec<u8>,
}

impl AxumTestResponse {
    pub const fn status_code(&self) -> u16 {
        self.status
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
