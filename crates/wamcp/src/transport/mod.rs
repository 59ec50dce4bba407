// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-delimited JSON-RPC over a byte stream (stdin/stdout in production).

pub mod protocol;

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::tools::Dispatcher;

use self::protocol::{
    CallToolParams, CallToolResult, IncomingMessage, InitializeResult, JsonRpcResponse, ListToolsResult,
    McpError, RequestId, JSONRPC_VERSION,
};

/// MCP server bound to one reader/writer pair.
pub struct McpServer<R, W> {
    dispatcher: Arc<Dispatcher>,
    reader: R,
    writer: W,
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(dispatcher: Arc<Dispatcher>, reader: R, writer: W) -> Self {
        Self { dispatcher, reader, writer }
    }

    /// Serve until EOF or shutdown. Requests are handled one at a time, in order.
    pub async fn run(mut self, shutdown: CancellationToken) -> anyhow::Result<()> {
        info!("mcp server ready");
        let mut line = String::new();
        loop {
            line.clear();
            let n = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested");
                    break;
                }
                read = self.reader.read_line(&mut line) => read?,
            };
            if n == 0 {
                info!("stdin closed, stopping");
                break;
            }

            let raw = line.trim();
            if raw.is_empty() {
                continue;
            }

            if let Some(response) = handle_line(&self.dispatcher, raw).await {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                self.writer.write_all(out.as_bytes()).await?;
                self.writer.flush().await?;
            }
        }
        self.writer.flush().await?;
        Ok(())
    }
}

/// Serve on the process's stdin and stdout.
pub async fn serve_stdio(dispatcher: Arc<Dispatcher>, shutdown: CancellationToken) -> anyhow::Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    McpServer::new(dispatcher, reader, tokio::io::stdout()).run(shutdown).await
}

/// Process one framed message. `None` for notifications.
pub async fn handle_line(dispatcher: &Dispatcher, raw: &str) -> Option<JsonRpcResponse> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(err = %e, "unparseable message");
            return Some(JsonRpcResponse::error(RequestId::Null, &McpError::Parse(e.to_string())));
        }
    };

    let msg: IncomingMessage = match serde_json::from_value(value) {
        Ok(m) => m,
        Err(e) => {
            warn!(err = %e, "malformed request");
            return Some(JsonRpcResponse::error(RequestId::Null, &McpError::InvalidRequest(e.to_string())));
        }
    };

    if msg.is_notification() {
        debug!(method = %msg.method, "notification");
        return None;
    }

    let id = msg.id.clone().unwrap_or(RequestId::Null);
    if msg.jsonrpc != JSONRPC_VERSION {
        let err = McpError::InvalidRequest(format!("expected jsonrpc 2.0, got {:?}", msg.jsonrpc));
        return Some(JsonRpcResponse::error(id, &err));
    }

    debug!(method = %msg.method, "request");
    match route(dispatcher, &msg.method, msg.params).await {
        Ok(result) => Some(JsonRpcResponse::success(id, result)),
        Err(e) => {
            warn!(method = %msg.method, code = e.as_str(), "request failed: {e}");
            Some(JsonRpcResponse::error(id, &e))
        }
    }
}

async fn route(dispatcher: &Dispatcher, method: &str, params: Value) -> Result<Value, McpError> {
    match method {
        "initialize" => to_value(&InitializeResult::current()),
        "ping" => Ok(json!({})),
        "tools/list" => to_value(&ListToolsResult { tools: dispatcher.tools() }),
        "tools/call" => {
            let params: CallToolParams =
                serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?;
            let arguments = params.arguments.unwrap_or_else(|| json!({}));
            let envelope = dispatcher.call(&params.name, &arguments).await;
            to_value(&CallToolResult::from(&envelope))
        }
        other => Err(McpError::MethodNotFound(other.to_owned())),
    }
}

fn to_value<T: serde::Serialize>(v: &T) -> Result<Value, McpError> {
    serde_json::to_value(v).map_err(|e| McpError::Internal(e.to_string()))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
