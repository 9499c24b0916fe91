// ABOUTME: Service-principal token acquisition via the OAuth2 client-credentials grant
// ABOUTME: Exchanges tenant, client id, and secret for a bearer token on every pipeline run
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

use std::fmt;

use serde::Deserialize;
use tracing::debug;

use super::{read_body, PowerBiClient};
use crate::{
    config::Credential,
    errors::{BiError, BiResult},
};

/// Opaque bearer token; never logged
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token string
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token for the `Authorization` header
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl PowerBiClient {
    /// Exchange the service-principal credential for a bearer token
    ///
    /// One attempt, no retry and no caching.
    ///
    /// # Errors
    ///
    /// Returns [`BiError::AuthFailure`] when the identity service rejects the
    /// exchange or answers without an `access_token`
    pub async fn acquire_token(&self, credential: &Credential) -> BiResult<AccessToken> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host,
            urlencoding::encode(&credential.tenant_id)
        );

        let response = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credential.client_id.as_str()),
                ("client_secret", credential.client_secret.as_str()),
                ("scope", credential.scope.as_str()),
            ])
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        if !(200..300).contains(&status) {
            return Err(BiError::AuthFailure { status, body });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        match parsed.access_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                debug!("Acquired Power BI access token");
                Ok(AccessToken(token))
            }
            None => Err(BiError::AuthFailure {
                status,
                body: "token response did not include an access_token".to_owned(),
            }),
        }
    }
}
