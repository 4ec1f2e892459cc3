use anyhow::{Context, Result};
use keyring::Entry;
use tracing::warn;

use super::store::{non_empty, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

const SERVICE_NAME: &str = "prepsquad";

/// Token pair kept in the OS keychain, one entry per storage key.
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a different keychain service name (separate profiles, tests)
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }

    fn read(&self, key: &str) -> Option<String> {
        let entry = match self.entry(key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Keyring unavailable");
                return None;
            }
        };
        match entry.get_password() {
            Ok(value) => non_empty(Some(&value)),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read token from keychain");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store token in keychain")
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    fn set_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()> {
        match non_empty(Some(access_token)) {
            Some(access) => self.write(ACCESS_TOKEN_KEY, &access)?,
            None => self.delete(ACCESS_TOKEN_KEY)?,
        }
        if let Some(refresh) = non_empty(refresh_token) {
            self.write(REFRESH_TOKEN_KEY, &refresh)?;
        }
        Ok(())
    }

    fn clear_tokens(&self) -> Result<()> {
        // Attempt both deletes even if the first fails
        let access = self.delete(ACCESS_TOKEN_KEY);
        let refresh = self.delete(REFRESH_TOKEN_KEY);
        access.and(refresh)
    }
}
