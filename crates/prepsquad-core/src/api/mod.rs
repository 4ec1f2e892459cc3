//! REST API access for the PrepSquad service.
//!
//! - `AuthGateway`: bearer-token requests with one-shot renewal on 401
//! - `PrepSquadClient`: typed operations (auth, groups, profiles)
//! - `ApiError`: the error taxonomy shared by both
//!
//! Tokens are obtained from `/auth/login` or `/auth/register` and renewed
//! through `/auth/refresh` using the stored refresh token.

pub mod client;
pub mod error;
pub mod gateway;

pub use client::PrepSquadClient;
pub use error::ApiError;
pub use gateway::{AuthGateway, AuthRequest, RenewalPolicy};
