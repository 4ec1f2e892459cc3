//! Application state for the PrepSquad command line.
//!
//! `App` ties together the loaded configuration, the API client and the
//! on-disk session that remembers who the stored tokens belong to.

use std::io::{self, Write};

use anyhow::{bail, Result};
use prepsquad_core::api::ApiError;
use prepsquad_core::models::User;
use prepsquad_core::{Config, PrepSquadClient};
use tracing::{info, warn};

use crate::session::Session;

pub struct App {
    pub config: Config,
    pub client: PrepSquadClient,
    session: Session,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let client = PrepSquadClient::from_config(&config)?;
        let mut session = Session::new(config.cache_dir()?);
        if let Err(e) = session.load() {
            warn!(error = %e, "Ignoring unreadable session file");
        }
        Ok(Self {
            config,
            client,
            session,
        })
    }

    /// The signed-in user, if both the session and the credentials survive
    pub fn user(&self) -> Option<&User> {
        if self.client.is_authenticated() {
            self.session.user()
        } else {
            None
        }
    }

    pub fn require_user(&self) -> Result<&User> {
        match self.user() {
            Some(user) => Ok(user),
            None => bail!("Not signed in. Run `prepsquad login` first."),
        }
    }

    pub fn signed_in_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.session.data.as_ref().map(|d| d.signed_in_at)
    }

    /// Interactive login
    pub async fn login(&mut self, email: Option<String>) -> Result<User> {
        let email = match email {
            Some(email) => email,
            None => {
                let last = self.session.user().map(|u| u.email.clone());
                Self::prompt_email(last.as_deref())?
            }
        };
        let password = Self::prompt_password()?;
        if email.is_empty() || password.is_empty() {
            bail!("Email and password required");
        }

        let user = self.client.login(&email, &password).await?;
        self.remember(user.clone());
        Ok(user)
    }

    /// Interactive registration. Signs the new account in.
    pub async fn register(&mut self, name: &str, email: &str) -> Result<User> {
        let password = Self::prompt_password()?;
        if password.is_empty() {
            bail!("Password required");
        }

        let user = self.client.register(name, email, &password).await?;
        self.remember(user.clone());
        Ok(user)
    }

    pub fn logout(&mut self) -> Result<()> {
        self.client.logout()?;
        self.session.clear()?;
        info!("Signed out");
        Ok(())
    }

    /// Drop the local session when the server has ended it
    pub fn on_error(&mut self, err: &anyhow::Error) {
        if ApiError::is_session_expired(err) {
            if let Err(e) = self.session.clear() {
                warn!(error = %e, "Failed to clear session");
            }
        }
    }

    fn remember(&mut self, user: User) {
        info!(user_id = %user.id, "Signed in");
        if let Err(e) = self.session.start(user) {
            warn!(error = %e, "Failed to save session");
        }
    }

    fn prompt_email(last: Option<&str>) -> Result<String> {
        match last {
            Some(last) => print!("Email [{}]: ", last),
            None => print!("Email: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        Ok(match last {
            Some(last) if input.is_empty() => last.to_string(),
            _ => input.to_string(),
        })
    }

    fn prompt_password() -> Result<String> {
        let password = rpassword::prompt_password("Password: ")?;
        Ok(password)
    }
}
