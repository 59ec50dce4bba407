// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token cache persistence: load/save a single JSON file with atomic writes.
//!
//! The cache only exists to survive restarts. Failures are logged and reported
//! as plain values; the in-memory credential stays authoritative.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, warn};

use crate::credential::StoredToken;

/// Distinguishes temp files of overlapping saves within one process.
static TMP_SEQ: AtomicU32 = AtomicU32::new(0);

/// File-backed cache for the current credential.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at the default location (`<state_dir>/oauth_token_cache.json`).
    pub fn new() -> Self {
        Self { path: crate::credential::default_cache_path() }
    }

    /// Create a store at a specific path (useful for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached token. `Ok(None)` when no cache file exists.
    pub fn try_load(&self) -> anyhow::Result<Option<StoredToken>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let token: StoredToken = serde_json::from_str(&contents)?;
        if token.access_token.is_empty() {
            return Ok(None);
        }
        Ok(Some(token))
    }

    /// Read the cached token, treating any failure as "no cache".
    pub fn load(&self) -> Option<StoredToken> {
        match self.try_load() {
            Ok(Some(token)) => Some(token),
            Ok(None) => {
                debug!(path = %self.path.display(), "no cached token");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring unreadable token cache: {e}");
                None
            }
        }
    }

    /// Write the token atomically (write tmp + rename), mode 0600 on Unix.
    ///
    /// Temp names carry PID and a sequence number, so concurrent saves never
    /// share (and truncate into) the same temp file.
    pub fn try_save(&self, token: &StoredToken) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(token)?;
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }

        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    /// Best-effort write. Returns whether the cache now matches `token`.
    pub fn save(&self, token: &StoredToken) -> bool {
        match self.try_save(token) {
            Ok(()) => {
                debug!(path = %self.path.display(), expires_at = token.expires_at, "cached token");
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), "failed to cache token: {e}");
                false
            }
        }
    }

    /// Remove the cache file. A missing file is not an error.
    pub fn delete(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed token cache"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "failed to remove token cache: {e}"),
        }
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
