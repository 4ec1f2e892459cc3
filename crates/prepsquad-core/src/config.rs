//! Application configuration management.
//!
//! Holds the API base URL, which credential store to use, and the renewal
//! policy for concurrent 401s.
//!
//! Configuration is stored at `~/.config/prepsquad/config.json`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::RenewalPolicy;
use crate::auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "prepsquad";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// API base used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Environment variable that overrides the configured API base
pub const API_URL_ENV: &str = "PREPSQUAD_API_URL";

/// Where the access/refresh token pair is kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub token_store: TokenStoreKind,
    pub renewal: RenewalPolicy,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_store: TokenStoreKind::default(),
            renewal: RenewalPolicy::default(),
            request_timeout_secs: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Apply `PREPSQUAD_API_URL` if it is set and non-empty
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
    }

    /// API base without a trailing slash, so paths can be appended directly
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Build the credential store selected by `token_store`
    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
        let store: Arc<dyn TokenStore> = match self.token_store {
            TokenStoreKind::File => Arc::new(FileTokenStore::new(self.cache_dir()?)),
            TokenStoreKind::Keyring => Arc::new(KeyringTokenStore::new()),
            TokenStoreKind::Memory => Arc::new(MemoryTokenStore::new()),
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base(), DEFAULT_API_BASE_URL);
        assert_eq!(config.token_store, TokenStoreKind::File);
        assert_eq!(config.renewal, RenewalPolicy::Independent);
        assert!(config.request_timeout_secs.is_none());
    }

    #[test]
    fn test_partial_config_file() {
        let config: Config =
            serde_json::from_str(r#"{"api_base_url": "https://prep.example.com/api/", "renewal": "coalesced"}"#)
                .unwrap();
        assert_eq!(config.api_base(), "https://prep.example.com/api");
        assert_eq!(config.renewal, RenewalPolicy::Coalesced);
        assert_eq!(config.token_store, TokenStoreKind::File);
    }

    #[test]
    fn test_memory_store_selection() {
        let config = Config {
            token_store: TokenStoreKind::Memory,
            ..Default::default()
        };
        let store = config.token_store().unwrap();
        assert!(!store.is_authenticated());
        store.set_tokens("a", None).unwrap();
        assert!(store.is_authenticated());
    }
}
