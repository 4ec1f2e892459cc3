use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Token file name in the per-user cache directory
const TOKENS_FILE: &str = "tokens.json";

/// Application name used for cache directory paths
const APP_NAME: &str = "prepsquad";

/// Durable storage for the access/refresh token pair.
///
/// Implementations are shared between every in-flight request, so all
/// methods take `&self` and writes are last-write-wins. Empty strings are
/// treated the same as absent values.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    /// Store a new access token. The refresh token is only written when one
    /// is supplied; `None` leaves any stored refresh token in place.
    fn set_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()>;

    /// Remove both tokens. Clearing an empty store is not an error.
    fn clear_tokens(&self) -> Result<()>;

    /// Presence of an access token is the whole contract; expiry is only
    /// discovered when a request comes back 401.
    fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }
}

/// On-disk and in-memory representation of the token pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl StoredTokens {
    fn apply(&mut self, access_token: &str, refresh_token: Option<&str>) {
        self.access_token = non_empty(Some(access_token));
        if let Some(refresh) = non_empty(refresh_token) {
            self.refresh_token = Some(refresh);
        }
    }

    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local token store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<StoredTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a token pair
    pub fn with_tokens(access_token: &str, refresh_token: Option<&str>) -> Self {
        let mut tokens = StoredTokens::default();
        tokens.apply(access_token, refresh_token);
        Self {
            tokens: RwLock::new(tokens),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        let tokens = self.tokens.read().unwrap_or_else(|e| e.into_inner());
        tokens.access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        let tokens = self.tokens.read().unwrap_or_else(|e| e.into_inner());
        tokens.refresh_token.clone()
    }

    fn set_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()> {
        let mut tokens = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        tokens.apply(access_token, refresh_token);
        Ok(())
    }

    fn clear_tokens(&self) -> Result<()> {
        let mut tokens = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        *tokens = StoredTokens::default();
        Ok(())
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// Token pair persisted as JSON in the user's cache directory.
///
/// The file is re-read on every access so separate processes see each
/// other's writes, the same way browser tabs share local storage.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    /// Store tokens in `dir/tokens.json`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(TOKENS_FILE),
            write_lock: Mutex::new(()),
        }
    }

    /// Store tokens under the platform cache directory
    pub fn default_location() -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(Self::new(cache_dir.join(APP_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoredTokens {
        if !self.path.exists() {
            return StoredTokens::default();
        }
        let parsed = std::fs::read_to_string(&self.path)
            .context("Failed to read token file")
            .and_then(|contents| {
                serde_json::from_str(&contents).context("Failed to parse token file")
            });
        match parsed {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable token file");
                StoredTokens::default()
            }
        }
    }

    fn save(&self, tokens: &StoredTokens) -> Result<()> {
        if tokens.is_empty() {
            return self.remove();
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create token directory")?;
        }
        let contents = serde_json::to_string_pretty(tokens)?;
        write_private(&self.path, contents.as_bytes()).context("Failed to write token file")?;
        debug!(path = %self.path.display(), "Token file saved");
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to delete token file"),
        }
    }
}

/// Write `contents` readable by the owner only. The file is created 0600,
/// and an existing file with looser permissions is tightened first.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    if path.exists() {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        self.load().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        self.load().refresh_token
    }

    fn set_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut tokens = self.load();
        tokens.apply(access_token, refresh_token);
        self.save(&tokens)
    }

    fn clear_tokens(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.remove()
    }
}
