// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

use crate::command::auth::AuthArgs;
use crate::credential::{
    default_cache_path, OAuthSettings, DEFAULT_API_VERSION, DEFAULT_DIALOG_URL, DEFAULT_GRAPH_URL,
    DEFAULT_REDIRECT_URI, DEFAULT_SCOPES,
};
use crate::tools::AccountIds;

/// WhatsApp Business MCP server.
#[derive(Debug, Parser)]
#[command(name = "wamcp", version, about)]
pub struct Config {
    /// OAuth app client ID.
    #[arg(long, env = "WHATSAPP_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth app client secret.
    #[arg(long, env = "WHATSAPP_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Redirect URI registered with the OAuth app.
    #[arg(long, env = "WHATSAPP_OAUTH_REDIRECT_URI", global = true, default_value = DEFAULT_REDIRECT_URI)]
    pub redirect_uri: String,

    /// Comma-separated OAuth scopes.
    #[arg(long, env = "WHATSAPP_OAUTH_SCOPES", global = true, default_value = DEFAULT_SCOPES)]
    pub scopes: String,

    /// WhatsApp Business Account (WABA) ID.
    #[arg(long, env = "WHATSAPP_BUSINESS_ACCOUNT_ID", global = true)]
    pub business_account_id: Option<String>,

    /// Sender phone number ID.
    #[arg(long, env = "WHATSAPP_PHONE_NUMBER_ID", global = true)]
    pub phone_number_id: Option<String>,

    /// Graph API version.
    #[arg(long, env = "WHATSAPP_API_VERSION", global = true, default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// Graph API base URL.
    #[arg(long, env = "WHATSAPP_GRAPH_URL", global = true, default_value = DEFAULT_GRAPH_URL)]
    pub graph_url: String,

    /// Authorization dialog base URL.
    #[arg(long, env = "WHATSAPP_DIALOG_URL", global = true, default_value = DEFAULT_DIALOG_URL)]
    pub dialog_url: String,

    /// Token cache file (defaults to the state directory).
    #[arg(long, env = "WHATSAPP_TOKEN_CACHE", global = true)]
    pub token_cache: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "WAMCP_LOG_LEVEL", global = true, default_value = "info")]
    pub log_level: String,

    /// Log format (json or text).
    #[arg(long, env = "WAMCP_LOG_FORMAT", global = true, default_value = "text")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Serve MCP over stdin/stdout (default).
    Serve,
    /// Manage the stored access token.
    Auth(AuthArgs),
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !matches!(self.log_format.as_str(), "json" | "text") {
            anyhow::bail!("--log-format must be json or text, got {:?}", self.log_format);
        }
        if self.api_version.trim().is_empty() {
            anyhow::bail!("--api-version must not be empty");
        }
        for (flag, url) in [
            ("--redirect-uri", &self.redirect_uri),
            ("--graph-url", &self.graph_url),
            ("--dialog-url", &self.dialog_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("{flag} must be an http(s) URL, got {url:?}");
            }
        }
        Ok(())
    }

    pub fn oauth_settings(&self) -> OAuthSettings {
        OAuthSettings {
            client_id: non_empty(&self.client_id),
            client_secret: non_empty(&self.client_secret),
            redirect_uri: self.redirect_uri.clone(),
            scopes: self.scopes.clone(),
            api_version: self.api_version.clone(),
            graph_url: self.graph_url.clone(),
            dialog_url: self.dialog_url.clone(),
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.token_cache.clone().unwrap_or_else(default_cache_path)
    }

    pub fn accounts(&self) -> AccountIds {
        AccountIds {
            phone_number_id: non_empty(&self.phone_number_id),
            business_account_id: non_empty(&self.business_account_id),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
