// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wamcp auth`: obtain, inspect and discard the delegated access token.

use tracing::info;

use crate::credential::manager::CredentialManager;
use crate::credential::{epoch_secs, DEFAULT_CALLBACK_PORT, DEFAULT_SHORT_LIVED_EXPIRES_IN};

/// CLI arguments for `wamcp auth`.
#[derive(Debug, clap::Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum AuthCommand {
    /// Authorize in the browser and store the resulting token.
    Login(LoginArgs),
    /// Show the stored token's status.
    Status,
    /// Forget the stored token.
    Logout,
    /// Store an access token obtained elsewhere.
    SetToken(SetTokenArgs),
    /// Print the authorization URL without starting a listener.
    Url(UrlArgs),
}

#[derive(Debug, clap::Args)]
pub struct LoginArgs {
    /// Local callback port (defaults to the redirect URI's port).
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, clap::Args)]
pub struct SetTokenArgs {
    /// Access token.
    pub token: String,
    /// Token TTL in seconds.
    #[arg(long, default_value_t = DEFAULT_SHORT_LIVED_EXPIRES_IN)]
    pub expires_in: u64,
}

#[derive(Debug, clap::Args)]
pub struct UrlArgs {
    /// Opaque state value echoed back on the callback.
    #[arg(long)]
    pub state: Option<String>,
}

/// Run the `wamcp auth` subcommand. Returns a process exit code.
pub async fn run(args: &AuthArgs, manager: &CredentialManager) -> i32 {
    match &args.command {
        AuthCommand::Login(login) => cmd_login(manager, login).await,
        AuthCommand::Status => cmd_status(manager),
        AuthCommand::Logout => cmd_logout(manager),
        AuthCommand::SetToken(set) => cmd_set_token(manager, set),
        AuthCommand::Url(url) => cmd_url(manager, url),
    }
}

async fn cmd_login(manager: &CredentialManager, args: &LoginArgs) -> i32 {
    if !manager.is_configured() {
        eprintln!("error: {}", crate::error::AuthError::NotConfigured);
        return 2;
    }
    let port = args.port.unwrap_or_else(|| callback_port(&manager.settings().redirect_uri));
    match manager.start_interactive_authorization(port).await {
        Ok(authorized) => {
            info!(expires_in = authorized.expires_in, "authorization complete");
            println!(
                "Authorized. Token valid for {} and saved to {}.",
                human_duration(authorized.expires_in),
                manager.store().path().display()
            );
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

fn cmd_status(manager: &CredentialManager) -> i32 {
    let status = manager.status();
    println!("{:<16} {}", "configured", status.configured);
    println!("{:<16} {}", "token", if status.has_token { "present" } else { "absent" });
    if let Some(secs) = status.expires_in_secs {
        let state = if secs == 0 { "expired".to_owned() } else { human_duration(secs) };
        println!("{:<16} {state}", "expires in");
    }
    println!("{:<16} {}", "refresh due", status.needs_refresh);
    println!("{:<16} {}", "cache", manager.store().path().display());
    if status.has_token {
        0
    } else {
        1
    }
}

fn cmd_logout(manager: &CredentialManager) -> i32 {
    manager.clear();
    println!("Signed out; removed {}.", manager.store().path().display());
    0
}

fn cmd_set_token(manager: &CredentialManager, args: &SetTokenArgs) -> i32 {
    let token = args.token.trim();
    if token.is_empty() {
        eprintln!("error: token must not be empty");
        return 2;
    }
    manager.set_access_token(token.to_owned(), args.expires_in);
    println!(
        "Token stored (expires at epoch {}).",
        epoch_secs().saturating_add(args.expires_in)
    );
    0
}

fn cmd_url(manager: &CredentialManager, args: &UrlArgs) -> i32 {
    match manager.get_authorization_url(args.state.as_deref()) {
        Ok(url) => {
            println!("{url}");
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            2
        }
    }
}

/// Port of a `http://host:port/...` redirect URI, else the default callback port.
pub fn callback_port(redirect_uri: &str) -> u16 {
    redirect_uri
        .split_once("://")
        .map(|(_, rest)| rest.split(['/', '?']).next().unwrap_or(rest))
        .and_then(|authority| authority.rsplit_once(':'))
        .and_then(|(_, port)| port.parse().ok())
        .unwrap_or(DEFAULT_CALLBACK_PORT)
}

/// `59d 23h`, `2h 5m`, `45s`.
pub fn human_duration(secs: u64) -> String {
    let (d, h, m) = (secs / 86_400, secs % 86_400 / 3600, secs % 3600 / 60);
    match (d, h, m) {
        (0, 0, 0) => format!("{secs}s"),
        (0, 0, m) => format!("{m}m"),
        (0, h, m) => format!("{h}h {m}m"),
        (d, h, _) => format!("{d}d {h}h"),
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
