//! API client for the PrepSquad REST API.
//!
//! `PrepSquadClient` exposes one method per backend call. Authenticated calls
//! go through the [`AuthGateway`]; login and registration talk to the API
//! directly since a 401 there means bad credentials, not a stale token.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Response;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::{ApiError, AuthGateway, AuthRequest};
use crate::auth::{bearer_value, TokenStore};
use crate::config::Config;
use crate::models::{
    Group, GroupRecord, HealthStatus, NewGroup, PrepType, Profile, ProfileRecord, ProfileUpdate,
    User,
};

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct JoinRequest<'a> {
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    user: User,
}

#[derive(Debug, Default, Deserialize)]
struct GroupsResponse {
    #[serde(default)]
    groups: Vec<GroupRecord>,
}

/// Endpoints answer either `{"group": {...}, "message": ...}` or the bare group
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GroupEnvelope {
    Wrapped { group: GroupRecord },
    Bare(GroupRecord),
}

impl GroupEnvelope {
    fn into_group(self) -> Group {
        match self {
            GroupEnvelope::Wrapped { group } | GroupEnvelope::Bare(group) => group.into_group(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileEnvelope {
    Wrapped { profile: ProfileRecord },
    Bare(ProfileRecord),
}

impl ProfileEnvelope {
    fn into_profile(self) -> Profile {
        match self {
            ProfileEnvelope::Wrapped { profile } | ProfileEnvelope::Bare(profile) => {
                profile.into_profile()
            }
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Typed client for the PrepSquad API.
/// Clone is cheap - the gateway shares its connection pool and token store.
#[derive(Clone)]
pub struct PrepSquadClient {
    gateway: AuthGateway,
}

impl PrepSquadClient {
    pub fn new(gateway: AuthGateway) -> Self {
        Self { gateway }
    }

    /// Build a client and its credential store from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = config.token_store()?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        let gateway =
            AuthGateway::from_config(config, store).context("Failed to create HTTP client")?;
        Ok(Self::new(gateway))
    }

    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    pub fn is_authenticated(&self) -> bool {
        self.gateway.store().is_authenticated()
    }

    /// Forget the stored credentials
    pub fn logout(&self) -> Result<()> {
        self.gateway
            .store()
            .clear_tokens()
            .context("Failed to clear stored credentials")
    }

    /// Check if response is successful, returning an error with the server's
    /// message (or `fallback`) if not.
    async fn check_response(response: Response, fallback: &str) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(%status, "Request rejected");
            Err(ApiError::from_status(status, &body, fallback))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    /// Send through the gateway, check the status and decode the body
    async fn call<T: DeserializeOwned>(
        &self,
        request: AuthRequest,
        fallback: &str,
        what: &str,
    ) -> Result<T> {
        let response = self.gateway.fetch_with_auth(&request).await?;
        let response = Self::check_response(response, fallback).await?;
        Ok(Self::parse_json(response, what).await?)
    }

    // ===== Authentication =====

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        self.authenticate("/auth/login", &LoginRequest { email, password })
            .await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        self.authenticate(
            "/auth/register",
            &RegisterRequest {
                name,
                email,
                password,
            },
        )
        .await
    }

    async fn authenticate<B: Serialize>(&self, path: &str, body: &B) -> Result<User> {
        let response = self
            .gateway
            .http()
            .post(self.gateway.url(path))
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)?;

        let response = Self::check_response(response, "Something went wrong").await?;
        let auth: AuthResponse = Self::parse_json(response, "auth response").await?;

        let access_token = auth
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("auth response has no access token".to_string()))?;
        if bearer_value(&access_token).is_err() {
            return Err(ApiError::InvalidResponse(
                "auth response access token is not a valid header value".to_string(),
            )
            .into());
        }

        // A new identity must not inherit a refresh token from a previous one
        let store = self.gateway.store();
        store.clear_tokens().context("Failed to clear stored credentials")?;
        store
            .set_tokens(&access_token, auth.refresh_token.as_deref())
            .context("Failed to store credentials")?;

        debug!(user_id = %auth.user.id, "Authenticated");
        Ok(auth.user)
    }

    // ===== Service =====

    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self
            .gateway
            .http()
            .get(self.gateway.url("/health"))
            .send()
            .await
            .map_err(ApiError::from)?;
        let response = Self::check_response(response, "Health check failed").await?;
        Ok(Self::parse_json(response, "health response").await?)
    }

    // ===== Groups =====

    /// List groups, optionally only those of one prep type
    pub async fn list_groups(&self, prep_type: Option<PrepType>) -> Result<Vec<Group>> {
        let url = match prep_type {
            Some(t) => format!("{}?prep_type={}", self.gateway.url("/groups"), t.as_str()),
            None => self.gateway.url("/groups"),
        };
        let parsed: GroupsResponse = self
            .call(AuthRequest::get(url), "Failed to load groups", "groups response")
            .await?;
        debug!("Loaded {} groups", parsed.groups.len());
        Ok(parsed.groups.into_iter().map(GroupRecord::into_group).collect())
    }

    /// Groups the given user created, for membership moderation
    pub async fn groups_created_by(&self, user_id: &str) -> Result<Vec<Group>> {
        let groups = self.list_groups(None).await?;
        Ok(groups.into_iter().filter(|g| g.is_creator(user_id)).collect())
    }

    pub async fn create_group(&self, new_group: &NewGroup) -> Result<Group> {
        let body = new_group.to_request()?;
        let request = AuthRequest::post(self.gateway.url("/groups")).json(&body)?;
        let envelope: GroupEnvelope = self
            .call(request, "Failed to create group", "created group")
            .await?;
        Ok(envelope.into_group())
    }

    pub async fn join_group(&self, group_id: &str, user_id: &str) -> Result<Group> {
        let url = self
            .gateway
            .url(&format!("/groups/{}/join", path_segment(group_id)?));
        let request = AuthRequest::post(url).json(&JoinRequest { user_id })?;
        let envelope: GroupEnvelope = self
            .call(request, "Failed to join group", "join response")
            .await?;
        Ok(envelope.into_group())
    }

    pub async fn approve_member(&self, group_id: &str, user_id: &str) -> Result<Group> {
        self.moderate(group_id, user_id, "approve", "Failed to approve member")
            .await
    }

    pub async fn reject_member(&self, group_id: &str, user_id: &str) -> Result<Group> {
        self.moderate(group_id, user_id, "reject", "Failed to reject member")
            .await
    }

    async fn moderate(
        &self,
        group_id: &str,
        user_id: &str,
        action: &str,
        fallback: &str,
    ) -> Result<Group> {
        let url = self.gateway.url(&format!(
            "/groups/{}/{}/{}",
            path_segment(group_id)?,
            action,
            path_segment(user_id)?
        ));
        let envelope: GroupEnvelope = self
            .call(AuthRequest::post(url), fallback, "moderation response")
            .await?;
        Ok(envelope.into_group())
    }

    // ===== Profiles =====

    pub async fn profile(&self, user_id: &str) -> Result<Profile> {
        let url = self
            .gateway
            .url(&format!("/users/{}/profile", path_segment(user_id)?));
        let envelope: ProfileEnvelope = self
            .call(AuthRequest::get(url), "Failed to load profile", "profile")
            .await?;
        Ok(envelope.into_profile())
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile> {
        let body = update.clone().normalized();
        let request = AuthRequest::put(self.gateway.url("/users/profile")).json(&body)?;
        let envelope: ProfileEnvelope = self
            .call(request, "Failed to update profile", "profile")
            .await?;
        Ok(envelope.into_profile())
    }
}

/// Reject IDs that would change the shape of the request path
fn path_segment(id: &str) -> Result<&str, ApiError> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#', '%']) || id.contains(char::is_whitespace) {
        return Err(ApiError::Validation(format!("Invalid identifier: {:?}", id)));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment(" 3f2a-11 ").unwrap(), "3f2a-11");
        assert!(path_segment("").is_err());
        assert!(path_segment("a/b").is_err());
        assert!(path_segment("a?b=1").is_err());
        assert!(path_segment("a b").is_err());
    }

    #[test]
    fn test_group_envelope_shapes() {
        let wrapped: GroupEnvelope = serde_json::from_str(
            r#"{"message": "Joined group successfully", "group": {"id": "g1", "members": ["u1", "u2"]}}"#,
        )
        .unwrap();
        let group = wrapped.into_group();
        assert_eq!(group.id, "g1");
        assert_eq!(group.member_count(), 2);

        let bare: GroupEnvelope =
            serde_json::from_str(r#"{"id": "g2", "name": "Bare"}"#).unwrap();
        assert_eq!(bare.into_group().name, "Bare");
    }

    #[test]
    fn test_profile_envelope_shapes() {
        let wrapped: ProfileEnvelope =
            serde_json::from_str(r#"{"profile": {"bio": "hi", "skills": ["rust"]}}"#).unwrap();
        assert_eq!(wrapped.into_profile().bio, "hi");

        let bare: ProfileEnvelope = serde_json::from_str(r#"{"bio": "bare"}"#).unwrap();
        assert_eq!(bare.into_profile().bio, "bare");
    }

    #[test]
    fn test_groups_response_missing_list() {
        let parsed: GroupsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.groups.is_empty());
    }
}
