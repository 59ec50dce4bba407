// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use wamcp::command;
use wamcp::config::{Command, Config};
use wamcp::credential::manager::CredentialManager;
use wamcp::credential::store::CredentialStore;
use wamcp::tools::graph::GraphClient;
use wamcp::tools::Dispatcher;
use wamcp::transport::serve_stdio;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    let manager = Arc::new(CredentialManager::new(
        config.oauth_settings(),
        CredentialStore::with_path(config.cache_path()),
    ));

    let code = match config.command {
        Some(Command::Auth(ref args)) => command::auth::run(args, &manager).await,
        Some(Command::Serve) | None => match serve(&config, manager).await {
            Ok(()) => 0,
            Err(e) => {
                error!("fatal: {e:#}");
                1
            }
        },
    };
    std::process::exit(code);
}

/// Logs go to stderr; stdout carries the protocol stream.
fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

async fn serve(config: &Config, manager: Arc<CredentialManager>) -> anyhow::Result<()> {
    let accounts = config.accounts();
    if !manager.is_configured() {
        warn!("OAuth client not configured; set WHATSAPP_CLIENT_ID and WHATSAPP_CLIENT_SECRET, then run `wamcp auth login`");
    }
    if manager.get_access_token().is_none() {
        warn!("no access token; tool calls will fail until `wamcp auth login` or `wamcp auth set-token`");
    }
    if accounts.business_account_id.is_none() {
        warn!("WHATSAPP_BUSINESS_ACCOUNT_ID not set; template and phone number listing tools will fail");
    }
    if accounts.phone_number_id.is_none() {
        warn!("WHATSAPP_PHONE_NUMBER_ID not set; messaging and media tools will fail");
    }

    let graph = GraphClient::new(&config.graph_url, &config.api_version);
    let dispatcher = Arc::new(Dispatcher::new(manager, graph, accounts));

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                shutdown.cancel();
            }
        });
    }

    info!(version = env!("CARGO_PKG_VERSION"), "serving MCP over stdio");
    serve_stdio(dispatcher, shutdown).await
}
