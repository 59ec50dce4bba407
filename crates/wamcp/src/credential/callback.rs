// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loopback HTTP listener that captures the OAuth redirect.
//!
//! Lives only for the duration of one interactive authorization. The first
//! hit on `/callback` settles the outcome; later hits get `409 Conflict`.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::error::AuthError;

/// How long in-flight connections get to finish after the outcome is known.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><head><title>Authorization complete</title></head>\
<body><h1>Authorization successful</h1><p>You can close this window and return to the terminal.</p></body></html>";

const MISSING_CODE_PAGE: &str = "<!DOCTYPE html><html><head><title>Authorization failed</title></head>\
<body><h1>Authorization failed</h1><p>No authorization code was received.</p></body></html>";

type Outcome = Result<String, AuthError>;

#[derive(Clone)]
struct CallbackState {
    slot: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

/// Raw query pairs. Repeated keys are legal; the first non-blank value wins.
struct CallbackQuery(Vec<(String, String)>);

impl CallbackQuery {
    fn first(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, v)| k == key && !v.is_empty()).map(|(_, v)| v.as_str())
    }
}

/// A bound callback listener. Dropping it stops the server.
pub struct CallbackListener {
    addr: SocketAddr,
    rx: Option<oneshot::Receiver<Outcome>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CallbackListener {
    /// Bind `127.0.0.1:port` and start serving. Port 0 picks a free port.
    ///
    /// Only the IPv4 loopback is bound, while the redirect URI names
    /// `localhost` because it must match the one registered with the app.
    /// Browsers that resolve `localhost` to `::1` first fall back to
    /// `127.0.0.1` when nothing listens on IPv6.
    pub async fn bind(port: u16) -> Result<Self, AuthError> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .map_err(|e| AuthError::Listener { message: format!("bind port {port}: {e}") })?;
        let addr =
            listener.local_addr().map_err(|e| AuthError::Listener { message: e.to_string() })?;

        let (tx, rx) = oneshot::channel();
        let state = CallbackState { slot: Arc::new(Mutex::new(Some(tx))) };
        let router = build_router(state);

        let cancel = CancellationToken::new();
        let sd = cancel.clone();
        let task = tokio::spawn(async move {
            let result =
                axum::serve(listener, router).with_graceful_shutdown(sd.cancelled_owned()).await;
            if let Err(e) = result {
                warn!("callback listener error: {e}");
            }
        });

        debug!(%addr, "callback listener bound");
        Ok(Self { addr, rx: Some(rx), cancel, task: Some(task) })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Redirect URI the provider must send the browser back to.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.addr.port())
    }

    /// Wait for the callback, then shut the server down before returning.
    pub async fn wait_for_code(mut self, timeout: Duration) -> Result<String, AuthError> {
        let outcome = match self.rx.take() {
            Some(rx) => match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) => {
                    Err(AuthError::Listener { message: "callback channel closed".to_owned() })
                }
                Err(_) => Err(AuthError::AuthorizationTimeout),
            },
            None => Err(AuthError::Listener { message: "callback already consumed".to_owned() }),
        };
        self.shutdown().await;
        outcome
    }

    /// Graceful stop, bounded drain, then abort. The port is free on return.
    async fn shutdown(&mut self) {
        self.cancel.cancel();
        let Some(mut task) = self.task.take() else {
            return;
        };
        if tokio::time::timeout(DRAIN_TIMEOUT, &mut task).await.is_err() {
            debug!("callback listener drain timed out, aborting");
            task.abort();
            let _ = task.await;
        }
        debug!(addr = %self.addr, "callback listener stopped");
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn build_router(state: CallbackState) -> Router {
    Router::new()
        .route("/callback", get(callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn callback(
    State(s): State<CallbackState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let q = CallbackQuery(pairs);
    let Some(tx) = s.slot.lock().take() else {
        debug!("duplicate callback ignored");
        return (StatusCode::CONFLICT, "authorization already handled").into_response();
    };

    match q.first("code") {
        Some(code) => {
            info!("authorization code received");
            let _ = tx.send(Ok(code.to_owned()));
            (StatusCode::OK, Html(SUCCESS_PAGE)).into_response()
        }
        None => {
            warn!(
                error = q.first("error").unwrap_or(""),
                description = q.first("error_description").unwrap_or(""),
                "callback without authorization code"
            );
            let _ = tx.send(Err(AuthError::MissingCode));
            (StatusCode::BAD_REQUEST, Html(MISSING_CODE_PAGE)).into_response()
        }
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
