// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serial_test::serial;

use super::*;

fn configured() -> OAuthSettings {
    OAuthSettings {
        client_id: Some("app-123".into()),
        client_secret: Some("shh".into()),
        ..OAuthSettings::default()
    }
}

#[yare::parameterized(
    both_set       = { Some("id"), Some("secret"), true },
    missing_id     = { None, Some("secret"), false },
    missing_secret = { Some("id"), None, false },
    empty_id       = { Some(""), Some("secret"), false },
    neither        = { None, None, false },
)]
fn is_configured_requires_both(id: Option<&str>, secret: Option<&str>, expected: bool) {
    let settings = OAuthSettings {
        client_id: id.map(str::to_owned),
        client_secret: secret.map(str::to_owned),
        ..OAuthSettings::default()
    };
    assert_eq!(settings.is_configured(), expected);
}

#[test]
fn endpoints_use_api_version() -> anyhow::Result<()> {
    let mut settings = configured();
    settings.graph_url = "http://127.0.0.1:9/".into();
    assert_eq!(settings.token_endpoint(), "http://127.0.0.1:9/v18.0/oauth/access_token");
    assert_eq!(settings.dialog_endpoint(), "https://www.facebook.com/v18.0/dialog/oauth");
    Ok(())
}

#[test]
fn issue_stamps_absolute_expiry() -> anyhow::Result<()> {
    let before = epoch_secs();
    let token = StoredToken::issue("tok".into(), 3600, None);
    let after = epoch_secs();
    assert!(token.expires_at >= before + 3600 && token.expires_at <= after + 3600);
    Ok(())
}

#[test]
fn refresh_boundary_is_one_day_before_expiry() -> anyhow::Result<()> {
    let now = 1_700_000_000;
    let inside = StoredToken {
        access_token: "a".into(),
        expires_at: now + REFRESH_BUFFER_SECS - 1,
        refresh_token: None,
    };
    let outside = StoredToken { expires_at: now + REFRESH_BUFFER_SECS + 1, ..inside.clone() };
    assert!(inside.needs_refresh(now));
    assert!(!outside.needs_refresh(now));
    Ok(())
}

#[test]
fn expired_token_reports_zero_remaining() -> anyhow::Result<()> {
    let token = StoredToken { access_token: "a".into(), expires_at: 100, refresh_token: None };
    assert_eq!(token.expires_in_secs(500), 0);
    assert!(token.needs_refresh(500));
    Ok(())
}

#[test]
fn stored_token_accepts_float_expiry() -> anyhow::Result<()> {
    let token: StoredToken = serde_json::from_str(
        r#"{"access_token":"A","expires_at":1734567890.75,"refresh_token":null}"#,
    )?;
    assert_eq!(token.expires_at, 1_734_567_890);
    assert_eq!(token.refresh_token, None);
    Ok(())
}

#[test]
fn stored_token_serializes_null_refresh() -> anyhow::Result<()> {
    let token = StoredToken { access_token: "A".into(), expires_at: 10, refresh_token: None };
    let value = serde_json::to_value(&token)?;
    assert_eq!(value["refresh_token"], serde_json::Value::Null);
    assert_eq!(value["expires_at"], 10);
    Ok(())
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() -> anyhow::Result<()> {
    std::env::set_var("WAMCP_STATE_DIR", "/tmp/wamcp-state-test");
    let dir = state_dir();
    std::env::remove_var("WAMCP_STATE_DIR");
    assert_eq!(dir, PathBuf::from("/tmp/wamcp-state-test"));
    assert_eq!(
        PathBuf::from("/tmp/wamcp-state-test").join("oauth_token_cache.json").file_name(),
        default_cache_path().file_name()
    );
    Ok(())
}
