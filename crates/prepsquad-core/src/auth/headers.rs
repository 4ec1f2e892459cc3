use reqwest::header::{self, HeaderMap, HeaderValue};

use super::TokenStore;
use crate::api::ApiError;

/// `Authorization` value for a bearer token, marked sensitive so it is
/// redacted from debug output
pub fn bearer_value(token: &str) -> Result<HeaderValue, ApiError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Default headers for a JSON API call: `Content-Type` always, plus a
/// bearer `Authorization` header when the store holds an access token.
pub fn auth_headers(store: &dyn TokenStore) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if let Some(token) = store.access_token() {
        headers.insert(header::AUTHORIZATION, bearer_value(&token)?);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;

    #[test]
    fn test_no_authorization_without_token() {
        let store = MemoryTokenStore::new();
        let headers = auth_headers(&store).unwrap();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.get(header::AUTHORIZATION).is_none());

        // A refresh token alone does not authorize requests
        store.set_tokens("", Some("refresh")).unwrap();
        let headers = auth_headers(&store).unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_bearer_header_with_token() {
        let store = MemoryTokenStore::with_tokens("abc.def.ghi", None);
        let headers = auth_headers(&store).unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc.def.ghi");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_header_tracks_store_changes() {
        let store = MemoryTokenStore::with_tokens("old", Some("r"));
        store.set_tokens("new", None).unwrap();
        let headers = auth_headers(&store).unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer new");

        store.clear_tokens().unwrap();
        let headers = auth_headers(&store).unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_invalid_token_is_an_error() {
        let store = MemoryTokenStore::with_tokens("bad\ntoken", None);
        assert!(matches!(auth_headers(&store), Err(ApiError::InvalidHeader(_))));
    }

    #[test]
    fn test_bearer_value() {
        let value = bearer_value("abc").unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value, "Bearer abc");
        assert!(bearer_value("a\r\nX-Injected: 1").is_err());
    }
}
