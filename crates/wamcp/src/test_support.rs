// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: provider mocks and assertion helpers.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::credential::{OAuthSettings, TokenSource};
use crate::tools::graph::GraphClient;
use crate::tools::{AccountIds, Call};

/// One request observed by [`MockProvider`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    /// Decode a form-encoded body into `(key, value)` pairs.
    pub fn form(&self) -> Vec<(String, String)> {
        form_pairs(&self.body)
    }

    /// Look up one form field.
    pub fn form_value(&self, key: &str) -> Option<String> {
        self.form().into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up one query parameter.
    pub fn query_value(&self, key: &str) -> Option<String> {
        form_pairs(self.query.as_deref().unwrap_or(""))
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// In-process stand-in for the Graph API and its token endpoint.
///
/// Answers every request, on any path, with the next scripted
/// `(status, body)` pair; once the script runs out the last entry repeats.
pub struct MockProvider {
    addr: SocketAddr,
    calls: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockProvider {
    pub async fn start(responses: Vec<(u16, String)>) -> anyhow::Result<Self> {
        let calls = Arc::new(AtomicU32::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(responses);

        let count = Arc::clone(&calls);
        let seen = Arc::clone(&requests);
        let app = Router::new().fallback(move |req: Request| {
            let count = Arc::clone(&count);
            let seen = Arc::clone(&seen);
            let resps = Arc::clone(&responses);
            async move {
                let (parts, body) = req.into_parts();
                let header = |name: &str| {
                    parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
                };
                let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
                seen.lock().push(RecordedRequest {
                    method: parts.method.to_string(),
                    path: parts.uri.path().to_owned(),
                    query: parts.uri.query().map(str::to_owned),
                    content_type: header("content-type"),
                    authorization: header("authorization"),
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                });

                let idx = count.fetch_add(1, Ordering::Relaxed) as usize;
                let (status, body) = resps
                    .get(idx)
                    .or_else(|| resps.last())
                    .cloned()
                    .unwrap_or((500, "{}".to_owned()));
                (
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    [("content-type", "application/json")],
                    body,
                )
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self { addr, calls, requests })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    /// Configured settings whose token endpoint points at this mock.
    pub fn settings(&self) -> OAuthSettings {
        OAuthSettings {
            client_id: Some("test-client".to_owned()),
            client_secret: Some("test-secret".to_owned()),
            graph_url: self.url(),
            ..OAuthSettings::default()
        }
    }
}

/// Token source returning a fixed value (or none).
#[derive(Debug, Clone, Default)]
pub struct StaticTokenSource(pub Option<String>);

impl StaticTokenSource {
    pub fn token(t: impl Into<String>) -> Self {
        Self(Some(t.into()))
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticTokenSource {
    async fn valid_token(&self) -> Option<String> {
        self.0.clone()
    }

    fn missing_token_message(&self) -> String {
        "no access token configured".to_owned()
    }
}

/// A [`MockProvider`] plus the Graph client and account ids tool handlers need.
pub struct GraphFixture {
    pub mock: MockProvider,
    pub graph: GraphClient,
    pub accounts: AccountIds,
}

impl GraphFixture {
    pub const PHONE: &'static str = "PN1";
    pub const WABA: &'static str = "WABA1";

    pub async fn start(responses: Vec<(u16, String)>) -> anyhow::Result<Self> {
        let mock = MockProvider::start(responses).await?;
        let graph = GraphClient::new(&mock.url(), "v18.0");
        let accounts = AccountIds {
            phone_number_id: Some(Self::PHONE.to_owned()),
            business_account_id: Some(Self::WABA.to_owned()),
        };
        Ok(Self { mock, graph, accounts })
    }

    /// Respond 200 with `body` to every request.
    pub async fn ok(body: serde_json::Value) -> anyhow::Result<Self> {
        Self::start(vec![(200, body.to_string())]).await
    }

    pub fn without_accounts(mut self) -> Self {
        self.accounts = AccountIds::default();
        self
    }

    pub fn call(&self) -> Call<'_> {
        Call { graph: &self.graph, token: "tok", accounts: &self.accounts }
    }

    pub fn last_request(&self) -> anyhow::Result<RecordedRequest> {
        self.mock.last_request().ok_or_else(|| anyhow::anyhow!("no request recorded"))
    }
}

/// Decoded value of one query parameter in a full URL.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let query = url.split_once('?').map(|(_, q)| q)?;
    form_pairs(query).into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

fn form_pairs(s: &str) -> Vec<(String, String)> {
    s.split('&')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let (k, v) = p.split_once('=').unwrap_or((p, ""));
            (form_decode(k), form_decode(v))
        })
        .collect()
}

fn form_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(b) => {
                        out.push(b);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
