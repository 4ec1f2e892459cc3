use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to connect to server: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Failed to refresh token (status {0})")]
    RefreshFailed(StatusCode),

    #[error("Session expired. Please login again.")]
    SessionExpired,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Credential storage error: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shapes the backend produces: `{"error": ...}` from the
/// application layer, `{"detail": ...}` from request validation.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<serde_json::Value>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the user-facing message out of a JSON error body.
    ///
    /// `error` wins over `detail`. A non-string `detail` (validation error
    /// lists) is rendered as compact JSON so nothing is silently dropped.
    pub fn extract_message(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        if let Some(error) = parsed.error.filter(|e| !e.is_empty()) {
            return Some(error);
        }
        match parsed.detail? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            serde_json::Value::Null | serde_json::Value::String(_) => None,
            other => Some(Self::truncate_body(&other.to_string())),
        }
    }

    /// Build an error for a non-success response, preferring the server's
    /// own message and falling back to `fallback` when the body has none.
    pub fn from_status(status: StatusCode, body: &str, fallback: &str) -> Self {
        let message = Self::extract_message(body).unwrap_or_else(|| fallback.to_string());
        ApiError::Rejected { status, message }
    }

    /// Status code of a rejected request, if this error came from one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Rejected { status, .. } | ApiError::RefreshFailed(status) => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }

    /// True when an error anywhere in the chain means the user must log in again.
    pub fn is_session_expired(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| {
            matches!(cause.downcast_ref::<ApiError>(), Some(ApiError::SessionExpired))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_prefers_error_field() {
        let body = r#"{"error": "Group is full", "detail": "ignored"}"#;
        assert_eq!(ApiError::extract_message(body).as_deref(), Some("Group is full"));
    }

    #[test]
    fn test_extract_message_detail_fallback() {
        let body = r#"{"detail": "User already exists"}"#;
        assert_eq!(ApiError::extract_message(body).as_deref(), Some("User already exists"));

        // FastAPI validation errors come back as a list
        let body = r#"{"detail": [{"loc": ["body", "email"], "msg": "invalid"}]}"#;
        let message = ApiError::extract_message(body).unwrap();
        assert!(message.contains("invalid"));
    }

    #[test]
    fn test_extract_message_none() {
        assert_eq!(ApiError::extract_message(""), None);
        assert_eq!(ApiError::extract_message("<html>502</html>"), None);
        assert_eq!(ApiError::extract_message(r#"{"error": ""}"#), None);
        assert_eq!(ApiError::extract_message(r#"{"message": "ok"}"#), None);
    }

    #[test]
    fn test_from_status_uses_fallback() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "oops", "Failed to load groups");
        assert_eq!(err.to_string(), "Failed to load groups");
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));

        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "Invalid credentials"}"#,
            "Something went wrong",
        );
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("truncated"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }

    #[test]
    fn test_is_session_expired_through_context() {
        let err = anyhow::Error::new(ApiError::SessionExpired).context("Failed to join group");
        assert!(ApiError::is_session_expired(&err));

        let err = anyhow::Error::new(ApiError::Validation("name".into()));
        assert!(!ApiError::is_session_expired(&err));
    }
}
