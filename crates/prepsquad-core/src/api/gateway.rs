//! Authenticated request gateway.
//!
//! Every API call made on behalf of a signed-in user goes through
//! [`AuthGateway::fetch_with_auth`]. The gateway attaches the bearer token
//! from the injected [`TokenStore`], and when a request comes back 401 it
//! renews the access token once and replays the request once. If renewal is
//! impossible the stored credentials are cleared and the caller gets
//! [`ApiError::SessionExpired`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::ApiError;
use crate::auth::{auth_headers, bearer_value, TokenStore};
use crate::config::Config;

/// How concurrent 401 handlers share token renewal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenewalPolicy {
    /// Every request that hits 401 renews on its own.
    #[default]
    Independent,
    /// Renewals are serialized; a request that waited on another renewal
    /// reuses the token it produced instead of renewing again.
    Coalesced,
}

/// An outbound request, kept around so it can be replayed after renewal.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl AuthRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    /// Add a caller header. Caller headers win over the gateway defaults.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body).map_err(ApiError::Encode)?);
        Ok(self)
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Bearer-token HTTP gateway with one-shot renewal on 401.
/// Clone is cheap; clones share the connection pool, store and renewal guard.
#[derive(Clone)]
pub struct AuthGateway {
    http: Client,
    api_base: String,
    store: Arc<dyn TokenStore>,
    policy: RenewalPolicy,
    renewal_lock: Arc<Mutex<()>>,
}

impl AuthGateway {
    /// Create a gateway for the API rooted at `api_base` (e.g.
    /// `https://host/api`); the renewal endpoint is `{api_base}/auth/refresh`.
    pub fn new(api_base: &str, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let http = Client::builder().build()?;
        Ok(Self::with_client(http, api_base, store))
    }

    /// Create a gateway that shares an existing connection pool
    pub fn with_client(http: Client, api_base: &str, store: Arc<dyn TokenStore>) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            store,
            policy: RenewalPolicy::default(),
            renewal_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Build a gateway from configuration: base URL, timeout and policy
    pub fn from_config(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build()?;
        Ok(Self::with_client(http, config.api_base(), store).with_policy(config.renewal))
    }

    pub fn with_policy(mut self, policy: RenewalPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RenewalPolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Absolute URL for an API path such as `/groups`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// The underlying client, for calls that must not carry credentials
    pub fn http(&self) -> &Client {
        &self.http
    }

    async fn send(&self, request: &AuthRequest) -> Result<Response, ApiError> {
        let mut headers = auth_headers(self.store.as_ref())?;
        headers.extend(request.headers.clone());

        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .headers(headers);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        debug!(method = %request.method, url = %request.url, status = %response.status(), "Request completed");
        Ok(response)
    }

    /// Perform `request` with the current credentials.
    ///
    /// A 401 triggers one renewal and one replay; the replay's response is
    /// returned whatever its status. Every other response, error statuses
    /// included, is returned untouched. If the renewal or the replay itself
    /// fails, the store is cleared and the session is expired.
    pub async fn fetch_with_auth(&self, request: &AuthRequest) -> Result<Response, ApiError> {
        let token_used = self.store.access_token();
        let response = self.send(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(url = %request.url, "Request unauthorized, renewing access token");
        if let Err(e) = self.renew(token_used.as_deref()).await {
            warn!(error = %e, "Token renewal failed, session expired");
            self.clear_store();
            return Err(ApiError::SessionExpired);
        }

        match self.send(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!(error = %e, "Replay after renewal failed, session expired");
                self.clear_store();
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn renew(&self, token_used: Option<&str>) -> Result<String, ApiError> {
        match self.policy {
            RenewalPolicy::Independent => self.refresh_access_token().await,
            RenewalPolicy::Coalesced => {
                let _guard = self.renewal_lock.lock().await;
                if let Some(current) = self.store.access_token() {
                    if token_used != Some(current.as_str()) {
                        debug!("Access token already renewed by a concurrent request");
                        return Ok(current);
                    }
                }
                self.refresh_access_token().await
            }
        }
    }

    /// Exchange the stored refresh token for a new token pair.
    ///
    /// Fails with [`ApiError::NoRefreshToken`] before any network call when
    /// no refresh token is stored. Any later failure clears the store.
    pub async fn refresh_access_token(&self) -> Result<String, ApiError> {
        let refresh_token = self
            .store
            .refresh_token()
            .ok_or(ApiError::NoRefreshToken)?;

        match self.request_renewal(&refresh_token).await {
            Ok(access_token) => {
                info!("Access token renewed");
                Ok(access_token)
            }
            Err(e) => {
                self.clear_store();
                Err(e)
            }
        }
    }

    async fn request_renewal(&self, refresh_token: &str) -> Result<String, ApiError> {
        let url = self.url("/auth/refresh");
        let response = self
            .http
            .post(&url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::RefreshFailed(status));
        }

        let body = response.text().await?;
        let renewed: RefreshResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("refresh response: {}", e)))?;
        if renewed.access_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "refresh response has an empty access token".to_string(),
            ));
        }
        if bearer_value(&renewed.access_token).is_err() {
            return Err(ApiError::InvalidResponse(
                "refresh response access token is not a valid header value".to_string(),
            ));
        }

        self.store
            .set_tokens(&renewed.access_token, renewed.refresh_token.as_deref())
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
        Ok(renewed.access_token)
    }

    /// Forget the stored credentials, logging rather than failing
    pub fn clear_store(&self) {
        if let Err(e) = self.store.clear_tokens() {
            warn!(error = %e, "Failed to clear stored tokens");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use reqwest::header;

    fn gateway() -> AuthGateway {
        AuthGateway::new("http://localhost:8000/api/", Arc::new(MemoryTokenStore::new())).unwrap()
    }

    #[test]
    fn test_url_joins_base() {
        let gw = gateway();
        assert_eq!(gw.api_base(), "http://localhost:8000/api");
        assert_eq!(gw.url("/groups"), "http://localhost:8000/api/groups");
    }

    #[test]
    fn test_request_builder() {
        let req = AuthRequest::post("http://x/api/groups")
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .json(&serde_json::json!({"name": "g"}))
            .unwrap();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.headers.get(header::ACCEPT).unwrap(), "application/json");
        assert_eq!(req.body.unwrap()["name"], "g");
    }

    #[test]
    fn test_policy_from_config() {
        let config = Config {
            renewal: RenewalPolicy::Coalesced,
            request_timeout_secs: Some(5),
            ..Default::default()
        };
        let gw = AuthGateway::from_config(&config, Arc::new(MemoryTokenStore::new())).unwrap();
        assert_eq!(gw.policy(), RenewalPolicy::Coalesced);
        assert_eq!(gw.api_base(), "http://localhost:8000/api");
        assert_eq!(gateway().policy(), RenewalPolicy::Independent);
    }
}
