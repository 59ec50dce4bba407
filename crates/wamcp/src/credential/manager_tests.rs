// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Notify;

use super::*;
use crate::credential::{REFRESH_BUFFER_SECS, DEFAULT_LONG_LIVED_EXPIRES_IN};
use crate::test_support::{query_param, MockProvider};

fn short_body() -> String {
    json!({ "access_token": "short", "expires_in": 3600, "token_type": "bearer" }).to_string()
}

fn long_body() -> String {
    json!({ "access_token": "long", "expires_in": 5_184_000, "token_type": "bearer" }).to_string()
}

fn provider_error(message: &str) -> String {
    json!({ "error": { "message": message, "type": "OAuthException" } }).to_string()
}

fn write_cache(path: &Path, access_token: &str, expires_at: u64, refresh: Option<&str>) {
    let body = json!({ "access_token": access_token, "expires_at": expires_at, "refresh_token": refresh });
    std::fs::write(path, body.to_string()).expect("write cache");
}

/// Token endpoint that parks every request until `release` is notified.
///
/// Returns settings pointing at it, plus the `arrived` and `release` signals.
async fn gated_provider(body: String) -> anyhow::Result<(OAuthSettings, Arc<Notify>, Arc<Notify>)> {
    let arrived = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let (a, r) = (Arc::clone(&arrived), Arc::clone(&release));
    let app = axum::Router::new().fallback(move || {
        let (arrived, release, body) = (Arc::clone(&a), Arc::clone(&r), body.clone());
        async move {
            arrived.notify_one();
            release.notified().await;
            ([("content-type", "application/json")], body)
        }
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    let settings = OAuthSettings {
        client_id: Some("test-client".to_owned()),
        client_secret: Some("test-secret".to_owned()),
        graph_url: format!("http://{addr}"),
        ..OAuthSettings::default()
    };
    Ok((settings, arrived, release))
}

struct Fixture {
    mock: MockProvider,
    dir: tempfile::TempDir,
}

impl Fixture {
    async fn new(responses: Vec<(u16, String)>) -> anyhow::Result<Self> {
        Ok(Self { mock: MockProvider::start(responses).await?, dir: tempfile::tempdir()? })
    }

    fn cache_path(&self) -> std::path::PathBuf {
        self.dir.path().join("oauth_token_cache.json")
    }

    fn manager(&self) -> CredentialManager {
        CredentialManager::new(self.mock.settings(), CredentialStore::with_path(self.cache_path()))
    }

    fn unconfigured(&self) -> CredentialManager {
        let settings = OAuthSettings { graph_url: self.mock.url(), ..OAuthSettings::default() };
        CredentialManager::new(settings, CredentialStore::with_path(self.cache_path()))
    }

    fn cached(&self) -> Option<StoredToken> {
        CredentialStore::with_path(self.cache_path()).load()
    }
}

#[tokio::test]
async fn cold_start_reads_cache_without_network() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(500, "{}".to_owned())]).await?;
    write_cache(&fx.cache_path(), "A", epoch_secs() + 100_000, None);

    let manager = fx.manager();
    assert_eq!(manager.get_access_token().as_deref(), Some("A"));
    assert_eq!(fx.mock.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn full_authorization_stores_long_lived_token() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, short_body()), (200, long_body())]).await?;
    let manager = fx.manager();

    let authorized = manager.exchange_code_for_token("abc").await?;
    assert_eq!(authorized, Authorized { access_token: "long".into(), expires_in: 5_184_000 });
    assert_eq!(manager.get_access_token().as_deref(), Some("long"));

    let cached = fx.cached().ok_or_else(|| anyhow::anyhow!("cache missing"))?;
    assert_eq!(cached.access_token, "long");
    assert!(cached.expires_at.abs_diff(epoch_secs() + 5_184_000) <= 1);

    let requests = fx.mock.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].form_value("code").as_deref(), Some("abc"));
    assert_eq!(
        requests[0].form_value("redirect_uri").as_deref(),
        Some(manager.settings().redirect_uri.as_str())
    );
    assert_eq!(requests[1].form_value("grant_type").as_deref(), Some("fb_exchange_token"));
    assert_eq!(requests[1].form_value("fb_exchange_token").as_deref(), Some("short"));
    Ok(())
}

#[tokio::test]
async fn upgrade_failure_keeps_short_lived_token() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, short_body()), (400, provider_error("nope"))]).await?;
    let manager = fx.manager();

    let authorized = manager.exchange_code_for_token("abc").await?;
    assert_eq!(authorized, Authorized { access_token: "short".into(), expires_in: 3600 });

    let cached = fx.cached().ok_or_else(|| anyhow::anyhow!("cache missing"))?;
    assert_eq!(cached.access_token, "short");
    assert!(cached.expires_at.abs_diff(epoch_secs() + 3600) <= 1);
    Ok(())
}

#[tokio::test]
async fn upgrade_without_expiry_uses_short_lived_expiry() -> anyhow::Result<()> {
    let short = json!({ "access_token": "short", "expires_in": 1800 }).to_string();
    let long = json!({ "access_token": "long" }).to_string();
    let fx = Fixture::new(vec![(200, short), (200, long)]).await?;

    let authorized = fx.manager().exchange_code_for_token("abc").await?;
    assert_eq!(authorized, Authorized { access_token: "long".into(), expires_in: 1800 });
    Ok(())
}

#[tokio::test]
async fn rejected_code_is_error_and_stores_nothing() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(400, provider_error("This authorization code has expired."))]).await?;
    let manager = fx.manager();

    let result = manager.exchange_code_for_token("stale").await;
    assert_eq!(result, Err(AuthError::exchange("This authorization code has expired.")));
    assert_eq!(manager.get_access_token(), None);
    assert!(!fx.cache_path().exists());
    assert_eq!(fx.mock.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn unconfigured_fails_fast_without_network() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, long_body())]).await?;
    write_cache(&fx.cache_path(), "A", epoch_secs() + 10, None);
    let manager = fx.unconfigured();

    assert!(!manager.is_configured());
    assert_eq!(manager.get_authorization_url(None), Err(AuthError::NotConfigured));
    assert_eq!(manager.exchange_code_for_token("abc").await, Err(AuthError::NotConfigured));
    assert_eq!(manager.refresh_if_needed().await, RefreshOutcome::NotConfigured);
    assert_eq!(
        manager.start_interactive_authorization_with(0, Duration::from_secs(1), |_| {}).await,
        Err(AuthError::NotConfigured)
    );
    // Non-network operations still work.
    assert_eq!(manager.get_access_token().as_deref(), Some("A"));
    assert_eq!(fx.mock.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn authorization_url_embeds_configuration() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![]).await?;
    let manager = fx.manager();

    let url = manager.get_authorization_url(None)?;
    assert!(url.starts_with("https://www.facebook.com/v18.0/dialog/oauth?"));
    assert_eq!(query_param(&url, "client_id").as_deref(), Some("test-client"));
    assert_eq!(query_param(&url, "redirect_uri").as_deref(), Some("http://localhost:8080/callback"));
    assert_eq!(query_param(&url, "scope").as_deref(), Some(manager.settings().scopes.as_str()));
    assert_eq!(query_param(&url, "response_type").as_deref(), Some("code"));
    assert_eq!(query_param(&url, "state").as_deref(), Some("whatsapp_mcp_oauth"));

    let custom = manager.get_authorization_url(Some("csrf 123"))?;
    assert_eq!(query_param(&custom, "state").as_deref(), Some("csrf 123"));
    Ok(())
}

#[tokio::test]
async fn refresh_is_idempotent_when_fresh() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, long_body())]).await?;
    let manager = fx.manager();
    manager.set_access_token("A".into(), DEFAULT_LONG_LIVED_EXPIRES_IN);

    assert_eq!(manager.refresh_if_needed().await, RefreshOutcome::Fresh);
    assert_eq!(manager.refresh_if_needed().await, RefreshOutcome::Fresh);
    assert_eq!(fx.mock.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn refresh_with_no_token_is_noop() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, long_body())]).await?;
    assert_eq!(fx.manager().refresh_if_needed().await, RefreshOutcome::NoToken);
    assert_eq!(fx.mock.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn refresh_triggers_just_inside_buffer() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, json!({ "access_token": "B" }).to_string())]).await?;
    write_cache(&fx.cache_path(), "A", epoch_secs() + REFRESH_BUFFER_SECS - 1, None);
    let manager = fx.manager();

    assert_eq!(manager.refresh_if_needed().await, RefreshOutcome::Refreshed);
    assert_eq!(manager.get_access_token().as_deref(), Some("B"));
    assert_eq!(fx.mock.calls(), 1);

    let req = fx.mock.last_request().ok_or_else(|| anyhow::anyhow!("no request"))?;
    assert_eq!(req.form_value("fb_exchange_token").as_deref(), Some("A"));

    let cached = fx.cached().ok_or_else(|| anyhow::anyhow!("cache missing"))?;
    assert_eq!(cached.access_token, "B");
    assert!(cached.expires_at.abs_diff(epoch_secs() + DEFAULT_LONG_LIVED_EXPIRES_IN) <= 1);
    Ok(())
}

#[tokio::test]
async fn refresh_skipped_just_outside_buffer() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, long_body())]).await?;
    // A small margin keeps the check stable across a second boundary.
    write_cache(&fx.cache_path(), "A", epoch_secs() + REFRESH_BUFFER_SECS + 30, None);
    let manager = fx.manager();

    assert_eq!(manager.refresh_if_needed().await, RefreshOutcome::Fresh);
    assert_eq!(fx.mock.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn failed_refresh_keeps_existing_token() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(400, provider_error("Session has expired"))]).await?;
    let expires_at = epoch_secs() + 60;
    write_cache(&fx.cache_path(), "A", expires_at, None);
    let manager = fx.manager();

    assert_eq!(manager.refresh_if_needed().await, RefreshOutcome::Failed);
    assert_eq!(manager.get_access_token().as_deref(), Some("A"));
    assert_eq!(manager.status().expires_at, Some(expires_at));
    Ok(())
}

#[tokio::test]
async fn refresh_retains_refresh_token() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, long_body())]).await?;
    write_cache(&fx.cache_path(), "A", epoch_secs() + 60, Some("r-1"));
    let manager = fx.manager();

    assert_eq!(manager.refresh_if_needed().await, RefreshOutcome::Refreshed);
    let cached = fx.cached().ok_or_else(|| anyhow::anyhow!("cache missing"))?;
    assert_eq!(cached.access_token, "long");
    assert_eq!(cached.refresh_token.as_deref(), Some("r-1"));
    Ok(())
}

#[tokio::test]
async fn concurrent_refresh_is_single_flight() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, long_body())]).await?;
    write_cache(&fx.cache_path(), "A", epoch_secs() + 60, None);
    let manager = fx.manager();

    let (a, b) = tokio::join!(manager.refresh_if_needed(), manager.refresh_if_needed());
    let outcomes = [a, b];
    assert!(outcomes.contains(&RefreshOutcome::Refreshed));
    assert!(outcomes.contains(&RefreshOutcome::Fresh));
    assert_eq!(fx.mock.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn get_valid_token_refreshes_first() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, long_body())]).await?;
    write_cache(&fx.cache_path(), "A", epoch_secs() + 60, None);
    let manager = fx.manager();

    assert_eq!(manager.get_valid_token().await.as_deref(), Some("long"));
    assert_eq!(manager.valid_token().await.as_deref(), Some("long"));
    assert_eq!(fx.mock.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_still_returned() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(500, "{}".to_owned())]).await?;
    write_cache(&fx.cache_path(), "old", epoch_secs().saturating_sub(10), None);
    let manager = fx.manager();

    assert_eq!(manager.get_access_token().as_deref(), Some("old"));
    assert_eq!(manager.get_valid_token().await.as_deref(), Some("old"));
    Ok(())
}

#[tokio::test]
async fn set_access_token_overrides_and_persists() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![]).await?;
    let manager = fx.unconfigured();

    manager.set_access_token("external".into(), 3600);
    assert_eq!(manager.get_access_token().as_deref(), Some("external"));

    let status = manager.status();
    assert!(!status.configured);
    assert!(status.has_token);
    assert!(!status.has_refresh_token);
    assert!(status.expires_in_secs.is_some_and(|s| s > 3590 && s <= 3600));
    assert!(status.needs_refresh);

    let reloaded = fx.unconfigured();
    assert_eq!(reloaded.get_access_token().as_deref(), Some("external"));
    Ok(())
}

#[tokio::test]
async fn clear_wipes_memory_and_cache() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, short_body()), (200, long_body())]).await?;
    let manager = fx.manager();
    manager.exchange_code_for_token("abc").await?;
    assert!(fx.cache_path().exists());

    manager.clear();
    assert_eq!(manager.get_access_token(), None);
    assert!(!fx.cache_path().exists());
    assert_eq!(manager.status(), CredentialStatus {
        configured: true,
        has_token: false,
        expires_at: None,
        expires_in_secs: None,
        has_refresh_token: false,
        needs_refresh: false,
    });
    Ok(())
}

#[tokio::test]
async fn missing_token_message_names_next_step() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![]).await?;
    let configured = fx.manager().missing_token_message();
    assert!(configured.contains("wamcp auth login"));

    let unconfigured = fx.unconfigured().missing_token_message();
    assert!(unconfigured.contains("WHATSAPP_CLIENT_ID"));
    assert!(unconfigured.contains("WHATSAPP_CLIENT_SECRET"));
    assert!(unconfigured.contains("wamcp auth login"));
    Ok(())
}

#[tokio::test]
async fn interactive_flow_uses_listener_redirect() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, short_body()), (200, long_body())]).await?;
    let manager = fx.manager();

    let presented = std::sync::Arc::new(parking_lot::Mutex::new(None));
    let seen = std::sync::Arc::clone(&presented);
    let authorized = manager
        .start_interactive_authorization_with(0, Duration::from_secs(10), move |url: &str| {
            *seen.lock() = Some(url.to_owned());
            let redirect = query_param(url, "redirect_uri").unwrap_or_default();
            let client = crate::credential::http_client(Duration::from_secs(5));
            tokio::spawn(async move {
                let _ = client.get(format!("{redirect}?code=abc&state=whatsapp_mcp_oauth")).send().await;
            });
        })
        .await?;

    assert_eq!(authorized.access_token, "long");
    assert_eq!(manager.get_access_token().as_deref(), Some("long"));

    let url = presented.lock().clone().ok_or_else(|| anyhow::anyhow!("url not presented"))?;
    let redirect = query_param(&url, "redirect_uri").unwrap_or_default();
    assert!(redirect.starts_with("http://localhost:"));
    assert!(redirect.ends_with("/callback"));

    // The code exchange used the flow's redirect; configuration is untouched.
    let first = fx.mock.requests().into_iter().next().ok_or_else(|| anyhow::anyhow!("no request"))?;
    assert_eq!(first.form_value("redirect_uri"), Some(redirect));
    assert_eq!(first.form_value("code").as_deref(), Some("abc"));
    assert_eq!(manager.settings().redirect_uri, "http://localhost:8080/callback");
    Ok(())
}

#[tokio::test]
async fn interactive_timeout_frees_port() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, short_body())]).await?;
    let manager = fx.manager();

    // Reserve a free port, then hand it to the flow.
    let port = tokio::net::TcpListener::bind("127.0.0.1:0").await?.local_addr()?.port();
    let result =
        manager.start_interactive_authorization_with(port, Duration::from_millis(100), |_| {}).await;
    assert_eq!(result, Err(AuthError::AuthorizationTimeout));
    assert_eq!(manager.get_access_token(), None);
    assert_eq!(fx.mock.calls(), 0);

    let rebound = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    assert_eq!(rebound.local_addr()?.port(), port);
    Ok(())
}

#[tokio::test]
async fn interactive_missing_code_fails() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, short_body())]).await?;
    let manager = fx.manager();

    let result = manager
        .start_interactive_authorization_with(0, Duration::from_secs(10), |url: &str| {
            let redirect = query_param(url, "redirect_uri").unwrap_or_default();
            let client = crate::credential::http_client(Duration::from_secs(5));
            tokio::spawn(async move {
                let _ = client.get(format!("{redirect}?error=access_denied")).send().await;
            });
        })
        .await;
    assert_eq!(result, Err(AuthError::MissingCode));
    assert_eq!(fx.mock.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn cache_write_failure_keeps_memory_update() -> anyhow::Result<()> {
    let fx = Fixture::new(vec![(200, short_body()), (200, long_body())]).await?;
    // The cache path's parent is a regular file, so every save fails.
    let blocker = fx.dir.path().join("blocker");
    std::fs::write(&blocker, "x")?;
    let cache = blocker.join("oauth_token_cache.json");
    let manager = CredentialManager::new(fx.mock.settings(), CredentialStore::with_path(cache.clone()));

    let authorized = manager.exchange_code_for_token("abc").await?;
    assert_eq!(authorized.access_token, "long");
    assert_eq!(manager.get_access_token().as_deref(), Some("long"));

    manager.set_access_token("external".into(), 600);
    assert_eq!(manager.get_access_token().as_deref(), Some("external"));
    assert!(!cache.exists());
    Ok(())
}

#[test]
fn concurrent_sets_leave_cache_matching_memory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cache = dir.path().join("oauth_token_cache.json");
    let manager =
        CredentialManager::new(OAuthSettings::default(), CredentialStore::with_path(cache.clone()));

    for round in 0..50 {
        std::thread::scope(|s| {
            for i in 0..8 {
                let manager = &manager;
                s.spawn(move || manager.set_access_token("t".repeat(1 + i * 37 + round % 5), 3600));
            }
        });
        let on_disk = CredentialStore::with_path(cache.clone())
            .load()
            .ok_or_else(|| anyhow::anyhow!("round {round}: cache unreadable"))?;
        assert_eq!(Some(on_disk.access_token), manager.get_access_token(), "round {round}");
    }

    // No stray temp files survive.
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}

#[tokio::test]
async fn clear_during_refresh_is_not_undone() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cache = dir.path().join("oauth_token_cache.json");
    write_cache(&cache, "A", epoch_secs() + 60, None);
    let (settings, arrived, release) = gated_provider(long_body()).await?;
    let manager = Arc::new(CredentialManager::new(settings, CredentialStore::with_path(cache.clone())));

    let refresh = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.refresh_if_needed().await }
    });
    arrived.notified().await;
    manager.clear();
    release.notify_one();

    assert_eq!(refresh.await?, RefreshOutcome::Superseded);
    assert_eq!(manager.get_access_token(), None);
    assert!(!cache.exists());
    Ok(())
}

#[tokio::test]
async fn set_token_during_refresh_wins() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cache = dir.path().join("oauth_token_cache.json");
    write_cache(&cache, "A", epoch_secs() + 60, None);
    let (settings, arrived, release) = gated_provider(long_body()).await?;
    let manager = Arc::new(CredentialManager::new(settings, CredentialStore::with_path(cache.clone())));

    let refresh = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.refresh_if_needed().await }
    });
    arrived.notified().await;
    manager.set_access_token("external".into(), 3600);
    release.notify_one();

    assert_eq!(refresh.await?, RefreshOutcome::Superseded);
    assert_eq!(manager.get_access_token().as_deref(), Some("external"));
    let cached = CredentialStore::with_path(cache).load().map(|t| t.access_token);
    assert_eq!(cached.as_deref(), Some("external"));
    Ok(())
}
