// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token endpoint calls: code exchange and long-lived token exchange.
//!
//! The provider has no refresh-token grant. Renewal re-exchanges a still-valid
//! token for a fresh long-lived one, so upgrade and refresh share one request.

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::credential::{
    http_client, OAuthSettings, DEFAULT_LONG_LIVED_EXPIRES_IN, DEFAULT_SHORT_LIVED_EXPIRES_IN,
    EXCHANGE_TIMEOUT,
};
use crate::error::AuthError;

/// Raw token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_expires_in")]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Result of exchanging an authorization code (or of a refresh).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
}

/// Result of a long-lived upgrade. `expires_in` is whatever the provider sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongLivedToken {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

/// Stateless client for the provider's token endpoint.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl TokenExchanger {
    pub fn new(token_url: String, client_id: String, client_secret: String) -> Self {
        Self { client: http_client(EXCHANGE_TIMEOUT), token_url, client_id, client_secret }
    }

    /// Build from settings, failing fast with `NotConfigured`.
    pub fn from_settings(settings: &OAuthSettings) -> Result<Self, AuthError> {
        let (id, secret) = settings.client_credentials()?;
        Ok(Self::new(settings.token_endpoint(), id.to_owned(), secret.to_owned()))
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Exchange an authorization code for a short-lived token.
    pub async fn exchange_code(
        &self,
        redirect_uri: &str,
        code: &str,
    ) -> Result<TokenGrant, AuthError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("code", code),
        ];
        let resp = self.post(&params).await?;
        let access_token = resp
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::exchange("response did not include an access_token"))?;
        Ok(TokenGrant {
            access_token,
            expires_in: resp.expires_in.unwrap_or(DEFAULT_SHORT_LIVED_EXPIRES_IN),
            refresh_token: resp.refresh_token,
        })
    }

    /// Exchange a token for a long-lived one. `None` when no upgrade is available.
    pub async fn upgrade_long_lived(&self, token: &str) -> Option<LongLivedToken> {
        match self.long_lived_exchange(token).await {
            Ok(resp) => match resp.access_token.filter(|t| !t.is_empty()) {
                Some(access_token) => {
                    Some(LongLivedToken { access_token, expires_in: resp.expires_in })
                }
                None => {
                    debug!("long-lived exchange returned no access_token");
                    None
                }
            },
            Err(e) => {
                debug!(err = %e, "long-lived exchange failed");
                None
            }
        }
    }

    /// Renew the held token through the long-lived exchange.
    pub async fn refresh_long_lived(&self, token: &str) -> Option<TokenGrant> {
        let upgraded = self.upgrade_long_lived(token).await?;
        Some(TokenGrant {
            access_token: upgraded.access_token,
            expires_in: upgraded.expires_in.unwrap_or(DEFAULT_LONG_LIVED_EXPIRES_IN),
            refresh_token: None,
        })
    }

    async fn long_lived_exchange(&self, token: &str) -> Result<TokenResponse, AuthError> {
        let params = [
            ("grant_type", "fb_exchange_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("fb_exchange_token", token),
        ];
        self.post(&params).await
    }

    async fn post(&self, params: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let resp = self
            .client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| AuthError::exchange(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| AuthError::exchange(e.to_string()))?;
        if !status.is_success() {
            return Err(AuthError::exchange(error_message(status.as_u16(), &text)));
        }
        serde_json::from_str(&text)
            .map_err(|e| AuthError::exchange(format!("invalid token response: {e}")))
    }
}

/// Prefer the provider's `error.message`, else the status and raw body.
pub fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => format!("HTTP {status}: {body}"),
    }
}

/// `expires_in` arrives as an integer, occasionally a float or numeric string.
fn lenient_expires_in<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => {
            n.as_u64().or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
        }
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
#[path = "exchange_tests.rs"]
mod tests;
