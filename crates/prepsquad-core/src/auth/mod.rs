//! Credential storage and request authentication.
//!
//! This module provides:
//! - `TokenStore`: the access/refresh token pair, injected into the gateway
//! - `MemoryTokenStore`, `FileTokenStore`, `KeyringTokenStore`: store backends
//! - `auth_headers`: default JSON + bearer headers for an API call
//!
//! Tokens carry no expiry information here; a stale access token is only
//! discovered when a request is rejected with 401.

pub mod credentials;
pub mod headers;
pub mod store;

pub use credentials::KeyringTokenStore;
pub use headers::{auth_headers, bearer_value};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
