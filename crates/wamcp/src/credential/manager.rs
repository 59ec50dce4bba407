// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The credential state machine: acquisition, refresh, persistence.

use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::credential::authorize::build_auth_url;
use crate::credential::callback::CallbackListener;
use crate::credential::exchange::{TokenExchanger, TokenGrant};
use crate::credential::store::CredentialStore;
use crate::credential::{
    epoch_secs, OAuthSettings, StoredToken, TokenSource, CALLBACK_TIMEOUT, DEFAULT_STATE,
};
use crate::error::AuthError;

/// Successful authorization: the token that ended up stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub access_token: String,
    pub expires_in: u64,
}

/// What `refresh_if_needed` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No token held; nothing to refresh.
    NoToken,
    /// Token is comfortably valid.
    Fresh,
    /// Refresh was due but client credentials are missing.
    NotConfigured,
    /// Token was re-exchanged and persisted.
    Refreshed,
    /// Exchange failed; the previous token is still in place.
    Failed,
    /// The credential was cleared or replaced while the exchange ran;
    /// the refreshed token was discarded.
    Superseded,
}

/// Point-in-time summary for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialStatus {
    pub configured: bool,
    pub has_token: bool,
    pub expires_at: Option<u64>,
    pub expires_in_secs: Option<u64>,
    pub has_refresh_token: bool,
    pub needs_refresh: bool,
}

/// Owns the process's single delegated credential.
pub struct CredentialManager {
    settings: OAuthSettings,
    exchanger: Option<TokenExchanger>,
    store: CredentialStore,
    token: RwLock<Option<StoredToken>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl CredentialManager {
    /// Construct and load the cached token, if any.
    pub fn new(settings: OAuthSettings, store: CredentialStore) -> Self {
        let exchanger = TokenExchanger::from_settings(&settings).ok();
        let cached = store.load();
        if let Some(ref t) = cached {
            debug!(expires_at = t.expires_at, "loaded cached token");
        }
        Self {
            settings,
            exchanger,
            store,
            token: RwLock::new(cached),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn is_configured(&self) -> bool {
        self.exchanger.is_some()
    }

    /// Authorization dialog URL for the configured redirect URI.
    pub fn get_authorization_url(&self, state: Option<&str>) -> Result<String, AuthError> {
        self.authorization_url_for(&self.settings.redirect_uri, state.unwrap_or(DEFAULT_STATE))
    }

    fn authorization_url_for(&self, redirect_uri: &str, state: &str) -> Result<String, AuthError> {
        let (client_id, _) = self.settings.client_credentials()?;
        Ok(build_auth_url(
            &self.settings.dialog_endpoint(),
            client_id,
            redirect_uri,
            &self.settings.scopes,
            state,
        ))
    }

    /// Exchange a code obtained with the configured redirect URI.
    pub async fn exchange_code_for_token(&self, code: &str) -> Result<Authorized, AuthError> {
        let redirect_uri = self.settings.redirect_uri.clone();
        self.exchange_code_with(&redirect_uri, code).await
    }

    async fn exchange_code_with(
        &self,
        redirect_uri: &str,
        code: &str,
    ) -> Result<Authorized, AuthError> {
        let exchanger = self.exchanger()?;
        let grant = exchanger.exchange_code(redirect_uri, code).await?;

        let (access_token, expires_in) = match exchanger.upgrade_long_lived(&grant.access_token).await
        {
            Some(long) => {
                debug!("upgraded to long-lived token");
                (long.access_token, long.expires_in.unwrap_or(grant.expires_in))
            }
            None => {
                info!("long-lived upgrade unavailable, keeping short-lived token");
                (grant.access_token, grant.expires_in)
            }
        };

        self.accept(StoredToken::issue(access_token.clone(), expires_in, grant.refresh_token));
        info!(expires_in, "authorization complete");
        Ok(Authorized { access_token, expires_in })
    }

    /// Re-exchange the held token if it expires within the refresh buffer.
    ///
    /// Never fails: a failed exchange leaves the existing token in place.
    /// Concurrent callers are serialized and only the first hits the network.
    pub async fn refresh_if_needed(&self) -> RefreshOutcome {
        match self.check_refresh() {
            Some(outcome) => return outcome,
            None if self.exchanger.is_none() => return RefreshOutcome::NotConfigured,
            None => {}
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(outcome) = self.check_refresh() {
            return outcome;
        }
        let Some(current) = self.get_access_token() else {
            return RefreshOutcome::NoToken;
        };
        let Some(exchanger) = self.exchanger.as_ref() else {
            return RefreshOutcome::NotConfigured;
        };

        match exchanger.refresh_long_lived(&current).await {
            Some(TokenGrant { access_token, expires_in, refresh_token }) => {
                let refreshed = StoredToken::issue(access_token, expires_in, refresh_token);
                if !self.accept_replacing(&current, refreshed) {
                    info!("credential changed during refresh, discarding refreshed token");
                    return RefreshOutcome::Superseded;
                }
                info!(expires_in, "token refreshed");
                RefreshOutcome::Refreshed
            }
            None => {
                warn!("token refresh failed, keeping current token");
                RefreshOutcome::Failed
            }
        }
    }

    /// `Some(outcome)` when no refresh is due.
    fn check_refresh(&self) -> Option<RefreshOutcome> {
        match self.token.read().as_ref() {
            None => Some(RefreshOutcome::NoToken),
            Some(t) if !t.needs_refresh(epoch_secs()) => Some(RefreshOutcome::Fresh),
            Some(_) => None,
        }
    }

    /// The held token, without refreshing. May be expired.
    pub fn get_access_token(&self) -> Option<String> {
        self.token.read().as_ref().map(|t| t.access_token.clone())
    }

    /// Refresh if due, then return whatever token is held.
    pub async fn get_valid_token(&self) -> Option<String> {
        self.refresh_if_needed().await;
        self.get_access_token()
    }

    /// Install an externally minted token, replacing any current one.
    pub fn set_access_token(&self, token: String, expires_in: u64) {
        self.accept(StoredToken::issue(token, expires_in, None));
        info!(expires_in, "access token set");
    }

    /// Forget the token in memory and on disk.
    ///
    /// A refresh already in flight will not resurrect the cleared token.
    pub fn clear(&self) {
        let mut guard = self.token.write();
        *guard = None;
        self.store.delete();
        drop(guard);
        info!("credentials cleared");
    }

    pub fn status(&self) -> CredentialStatus {
        let now = epoch_secs();
        let guard = self.token.read();
        let token = guard.as_ref();
        CredentialStatus {
            configured: self.is_configured(),
            has_token: token.is_some(),
            expires_at: token.map(|t| t.expires_at),
            expires_in_secs: token.map(|t| t.expires_in_secs(now)),
            has_refresh_token: token.is_some_and(|t| t.refresh_token.is_some()),
            needs_refresh: token.is_some_and(|t| t.needs_refresh(now)),
        }
    }

    /// Run the browser authorization flow against a listener on `port`.
    pub async fn start_interactive_authorization(&self, port: u16) -> Result<Authorized, AuthError> {
        self.start_interactive_authorization_with(port, CALLBACK_TIMEOUT, present_url).await
    }

    /// Interactive flow with an explicit timeout and URL presenter.
    pub async fn start_interactive_authorization_with<F>(
        &self,
        port: u16,
        timeout: Duration,
        present: F,
    ) -> Result<Authorized, AuthError>
    where
        F: FnOnce(&str) + Send,
    {
        self.exchanger()?;
        let listener = CallbackListener::bind(port).await?;
        let redirect_uri = listener.redirect_uri();
        let url = self.authorization_url_for(&redirect_uri, DEFAULT_STATE)?;

        info!(%redirect_uri, "waiting for authorization callback");
        present(&url);

        let code = listener.wait_for_code(timeout).await?;
        self.exchange_code_with(&redirect_uri, &code).await
    }

    fn exchanger(&self) -> Result<&TokenExchanger, AuthError> {
        self.exchanger.as_ref().ok_or(AuthError::NotConfigured)
    }

    /// Install `token` in the cache and memory while holding the write guard.
    /// Keeps the old refresh token if none came back.
    fn accept(&self, mut token: StoredToken) {
        let mut guard = self.token.write();
        if token.refresh_token.is_none() {
            token.refresh_token = guard.as_ref().and_then(|t| t.refresh_token.clone());
        }
        self.store.save(&token);
        *guard = Some(token);
    }

    /// Like `accept`, but only if `replaces` is still the held access token.
    ///
    /// Returns false when the credential was cleared or replaced meanwhile.
    fn accept_replacing(&self, replaces: &str, mut token: StoredToken) -> bool {
        let mut guard = self.token.write();
        let Some(held) = guard.as_ref().filter(|t| t.access_token == replaces) else {
            return false;
        };
        if token.refresh_token.is_none() {
            token.refresh_token = held.refresh_token.clone();
        }
        self.store.save(&token);
        *guard = Some(token);
        true
    }
}

#[async_trait::async_trait]
impl TokenSource for CredentialManager {
    async fn valid_token(&self) -> Option<String> {
        self.get_valid_token().await
    }

    fn missing_token_message(&self) -> String {
        if self.is_configured() {
            "No access token available. Run `wamcp auth login` to authorize, \
             or set one with `wamcp auth set-token`."
                .to_owned()
        } else {
            format!("{}, then run `wamcp auth login`.", AuthError::NotConfigured)
        }
    }
}

/// Print the authorization URL and try to open it in the default browser.
fn present_url(url: &str) {
    eprintln!("Open this URL in your browser to authorize:\n\n  {url}\n");
    if let Err(e) = open::that(url) {
        warn!("could not open browser: {e}");
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
