// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Failures surfaced by the credential entry points.
///
/// Persistence problems are deliberately absent: the store logs them and
/// reports a plain `bool`/`Option`, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// `client_id` or `client_secret` is missing. No network I/O was attempted.
    NotConfigured,
    /// The provider rejected a code or token exchange.
    Exchange { message: String },
    /// No callback arrived before the interactive flow's deadline.
    AuthorizationTimeout,
    /// The callback was hit without a `code` query parameter.
    MissingCode,
    /// The local callback listener could not be started.
    Listener { message: String },
}

impl AuthError {
    pub fn exchange(message: impl Into<String>) -> Self {
        Self::Exchange { message: message.into() }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotConfigured => "NOT_CONFIGURED",
            Self::Exchange { .. } => "EXCHANGE_ERROR",
            Self::AuthorizationTimeout => "AUTHORIZATION_TIMEOUT",
            Self::MissingCode => "MISSING_CODE",
            Self::Listener { .. } => "LISTENER_ERROR",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => f.write_str(
                "OAuth2 not configured: set WHATSAPP_CLIENT_ID and WHATSAPP_CLIENT_SECRET",
            ),
            Self::Exchange { message } => write!(f, "token exchange failed: {message}"),
            Self::AuthorizationTimeout => {
                f.write_str("OAuth flow timed out waiting for the callback, please try again")
            }
            Self::MissingCode => f.write_str("no authorization code found in callback"),
            Self::Listener { message } => write!(f, "callback listener failed: {message}"),
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
