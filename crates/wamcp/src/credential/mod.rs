// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delegated-access credential lifecycle for the Graph API.
//!
//! One credential set per process: acquired through the OAuth authorization
//! code flow (with a local callback listener), upgraded to a long-lived token,
//! cached on disk, and re-exchanged shortly before it expires.

pub mod authorize;
pub mod callback;
pub mod exchange;
pub mod manager;
pub mod store;

use std::path::PathBuf;
use std::sync::Once;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AuthError;

/// Refresh when the token expires within this many seconds (1 day).
pub const REFRESH_BUFFER_SECS: u64 = 24 * 3600;

/// Provider default lifetime of a short-lived token.
pub const DEFAULT_SHORT_LIVED_EXPIRES_IN: u64 = 3600;

/// Provider default lifetime of a long-lived token (60 days).
pub const DEFAULT_LONG_LIVED_EXPIRES_IN: u64 = 5_184_000;

/// `state` parameter used when the caller does not supply one.
pub const DEFAULT_STATE: &str = "whatsapp_mcp_oauth";

/// Port the interactive flow listens on unless told otherwise.
pub const DEFAULT_CALLBACK_PORT: u16 = 8080;

/// How long the interactive flow waits for the browser redirect.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for every token endpoint request.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";
pub const DEFAULT_SCOPES: &str =
    "whatsapp_business_management,whatsapp_business_messaging,business_management";
pub const DEFAULT_API_VERSION: &str = "v18.0";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_DIALOG_URL: &str = "https://www.facebook.com";

/// Static OAuth client configuration. Never persisted.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    /// Comma-separated provider permission strings.
    pub scopes: String,
    pub api_version: String,
    /// Base URL of the Graph API (token endpoint host).
    pub graph_url: String,
    /// Base URL of the authorization dialog.
    pub dialog_url: String,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_owned(),
            scopes: DEFAULT_SCOPES.to_owned(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            graph_url: DEFAULT_GRAPH_URL.to_owned(),
            dialog_url: DEFAULT_DIALOG_URL.to_owned(),
        }
    }
}

impl OAuthSettings {
    pub fn is_configured(&self) -> bool {
        self.client_credentials().is_ok()
    }

    /// `(client_id, client_secret)`, or `NotConfigured` if either is missing or empty.
    pub fn client_credentials(&self) -> Result<(&str, &str), AuthError> {
        let id = self.client_id.as_deref().filter(|s| !s.is_empty());
        let secret = self.client_secret.as_deref().filter(|s| !s.is_empty());
        match (id, secret) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(AuthError::NotConfigured),
        }
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/{}/oauth/access_token", self.graph_url.trim_end_matches('/'), self.api_version)
    }

    pub fn dialog_endpoint(&self) -> String {
        format!("{}/{}/dialog/oauth", self.dialog_url.trim_end_matches('/'), self.api_version)
    }
}

/// A bearer token together with its absolute expiry.
///
/// This is both the in-memory credential and the on-disk cache layout, so an
/// access token can never exist without its `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    /// Expiry as epoch seconds.
    #[serde(deserialize_with = "lenient_epoch_secs")]
    pub expires_at: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl StoredToken {
    /// Accept a token now, stamping `expires_at = now + expires_in`.
    pub fn issue(access_token: String, expires_in: u64, refresh_token: Option<String>) -> Self {
        Self { access_token, expires_at: epoch_secs().saturating_add(expires_in), refresh_token }
    }

    /// Seconds of validity left at `now` (zero once expired).
    pub fn expires_in_secs(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }

    /// True unless `now` is comfortably before `expires_at - REFRESH_BUFFER_SECS`.
    pub fn needs_refresh(&self, now: u64) -> bool {
        now >= self.expires_at.saturating_sub(REFRESH_BUFFER_SECS)
    }
}

/// Where outbound API calls get their bearer token.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    /// A usable token, refreshed first if it is close to expiry.
    async fn valid_token(&self) -> Option<String>;

    /// User-facing explanation for when `valid_token` returns `None`.
    fn missing_token_message(&self) -> String;
}

/// Older caches stored `expires_at` as a float; truncate those to whole seconds.
fn lenient_epoch_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 {
        return Err(serde::de::Error::custom(format!("invalid expires_at: {value}")));
    }
    Ok(value as u64)
}

/// Return current epoch seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Resolve the state directory for wamcp data.
///
/// Checks `WAMCP_STATE_DIR`, then `$XDG_STATE_HOME/wamcp`,
/// then `$HOME/.local/state/wamcp`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("WAMCP_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("wamcp");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/wamcp");
    }
    PathBuf::from(".wamcp")
}

/// Default location of the token cache file.
pub fn default_cache_path() -> PathBuf {
    state_dir().join("oauth_token_cache.json")
}

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Build an HTTP client with a per-request timeout.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    ensure_crypto();
    reqwest::Client::builder().timeout(timeout).build().unwrap_or_default()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
