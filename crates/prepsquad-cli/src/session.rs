use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use prepsquad_core::models::User;
use serde::{Deserialize, Serialize};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// The signed-in user, as the shell remembers it between runs.
///
/// Credentials live in the token store; this only records who they belong
/// to. Tokens carry no expiry here, so neither does the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub user: User,
    pub signed_in_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(user: User) -> Self {
        Self {
            user,
            signed_in_at: Utc::now(),
        }
    }
}

pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read session file")?;
            let data: SessionData = serde_json::from_str(&contents)
                .context("Failed to parse session file")?;
            self.data = Some(data);
            return Ok(true);
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Record a freshly signed-in user
    pub fn start(&mut self, user: User) -> Result<()> {
        self.data = Some(SessionData::new(user));
        self.save()
    }

    pub fn user(&self) -> Option<&User> {
        self.data.as_ref().map(|d| &d.user)
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}
