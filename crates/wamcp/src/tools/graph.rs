// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-authenticated Graph API client.

use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use crate::credential::http_client;
use crate::tools::ToolError;

/// Timeout for JSON requests.
pub const GRAPH_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for media uploads.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    upload_client: reqwest::Client,
    base_url: String,
}

impl GraphClient {
    pub fn new(graph_url: &str, api_version: &str) -> Self {
        Self {
            client: http_client(GRAPH_TIMEOUT),
            upload_client: http_client(UPLOAD_TIMEOUT),
            base_url: format!("{}/{}", graph_url.trim_end_matches('/'), api_version),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ToolError> {
        let req = self.client.get(self.url(path)).bearer_auth(token).query(query);
        let (status, text) = execute(req).await?;
        decode(status, &text)
    }

    /// GET that only yields a body on 200. Failures are not errors.
    pub async fn get_optional(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Option<Value> {
        let req = self.client.get(self.url(path)).bearer_auth(token).query(query);
        match execute(req).await {
            Ok((status, text)) if status == StatusCode::OK => serde_json::from_str(&text).ok(),
            Ok((status, _)) => {
                debug!(path, %status, "optional lookup returned non-200");
                None
            }
            Err(e) => {
                debug!(path, err = %e, "optional lookup failed");
                None
            }
        }
    }

    pub async fn post_json(&self, token: &str, path: &str, body: &Value) -> Result<Value, ToolError> {
        let req = self.client.post(self.url(path)).bearer_auth(token).json(body);
        let (status, text) = execute(req).await?;
        decode(status, &text)
    }

    /// DELETE; a non-JSON success body is returned as `{"raw": <text>}`.
    pub async fn delete(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ToolError> {
        let req = self.client.delete(self.url(path)).bearer_auth(token).query(query);
        let (status, text) = execute(req).await?;
        if !status.is_success() {
            return Err(provider_error(status, &text));
        }
        Ok(serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text })))
    }

    pub async fn upload(&self, token: &str, path: &str, form: Form) -> Result<Value, ToolError> {
        let req = self.upload_client.post(self.url(path)).bearer_auth(token).multipart(form);
        let (status, text) = execute(req).await?;
        decode(status, &text)
    }
}

async fn execute(req: RequestBuilder) -> Result<(StatusCode, String), ToolError> {
    let resp = req.send().await.map_err(unexpected)?;
    let status = resp.status();
    let text = resp.text().await.map_err(unexpected)?;
    Ok((status, text))
}

fn decode(status: StatusCode, text: &str) -> Result<Value, ToolError> {
    if !status.is_success() {
        return Err(provider_error(status, text));
    }
    serde_json::from_str(text).map_err(|e| ToolError::new(format!("Unexpected error: invalid JSON response: {e}")))
}

/// Map an error response to its `error.message`, keeping the body as data.
pub fn provider_error(status: StatusCode, text: &str) -> ToolError {
    let body: Option<Value> = serde_json::from_str(text).ok();
    let message = body
        .as_ref()
        .and_then(|b| b.pointer("/error/message"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    match (message, body) {
        (Some(message), body) => ToolError { message, data: body },
        (None, Some(body)) => ToolError { message: format!("HTTP {}", status.as_u16()), data: Some(body) },
        (None, None) if text.is_empty() => ToolError::new(format!("HTTP {}", status.as_u16())),
        (None, None) => ToolError::new(format!("HTTP {}: {text}", status.as_u16())),
    }
}

fn unexpected(e: reqwest::Error) -> ToolError {
    ToolError::new(format!("Unexpected error: {e}"))
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
