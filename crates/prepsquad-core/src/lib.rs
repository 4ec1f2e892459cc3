//! PrepSquad core library.
//!
//! Credential storage, the authenticated request gateway, and a typed client
//! for the study-group API. Front ends (the `prepsquad` CLI) hold session
//! state and rendering; everything that talks to the backend lives here.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, AuthGateway, AuthRequest, PrepSquadClient, RenewalPolicy};
pub use auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
pub use config::Config;
