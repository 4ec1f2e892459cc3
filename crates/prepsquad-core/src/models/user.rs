use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl User {
    /// Name for greetings, falling back to the email address
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// Backend liveness response from `GET /health`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let mut user = User {
            id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
        };
        assert_eq!(user.display_name(), "Ada");
        user.name = " ".to_string();
        assert_eq!(user.display_name(), "ada@example.com");
    }

    #[test]
    fn test_health_status() {
        let health: HealthStatus =
            serde_json::from_str(r#"{"status": "ok", "message": "PrepSquad API is running"}"#)
                .unwrap();
        assert!(health.is_ok());
        assert!(!HealthStatus::default().is_ok());
    }
}
