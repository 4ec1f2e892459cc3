//! Study group models.
//!
//! `GroupRecord` mirrors whatever the API returns, with every field optional.
//! `Group` is the normalized domain type the rest of the code works with;
//! all fallbacks are applied once, in `GroupRecord::into_group`.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Group capacity assumed when the API omits `max_members`
pub const DEFAULT_MAX_MEMBERS: u32 = 10;

/// What the group is preparing for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum PrepType {
    #[default]
    Faang,
    AwsCert,
    GcpCert,
    AzureCert,
    SystemDesign,
    #[serde(other)]
    Other,
}

impl PrepType {
    pub const ALL: [PrepType; 6] = [
        PrepType::Faang,
        PrepType::AwsCert,
        PrepType::GcpCert,
        PrepType::AzureCert,
        PrepType::SystemDesign,
        PrepType::Other,
    ];

    /// Wire value used in request bodies and the `prep_type` query filter
    pub fn as_str(&self) -> &'static str {
        match self {
            PrepType::Faang => "FAANG",
            PrepType::AwsCert => "AWS_CERT",
            PrepType::GcpCert => "GCP_CERT",
            PrepType::AzureCert => "AZURE_CERT",
            PrepType::SystemDesign => "SYSTEM_DESIGN",
            PrepType::Other => "OTHER",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PrepType::Faang => "FAANG Interview Prep",
            PrepType::AwsCert => "AWS Certification",
            PrepType::GcpCert => "GCP Certification",
            PrepType::AzureCert => "Azure Certification",
            PrepType::SystemDesign => "System Design",
            PrepType::Other => "Other",
        }
    }

    /// Parse a wire value, case-insensitively. Unknown values yield `None`
    /// so user input can be rejected instead of silently becoming `Other`.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl std::fmt::Display for PrepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum RegistrationStatus {
    #[default]
    Open,
    Full,
    Closed,
    #[serde(other)]
    Unknown,
}

impl RegistrationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RegistrationStatus::Open => "OPEN",
            RegistrationStatus::Full => "FULL",
            RegistrationStatus::Closed => "CLOSED",
            RegistrationStatus::Unknown => "UNKNOWN",
        }
    }
}

/// Group as returned by the API, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prep_type: Option<PrepType>,
    #[serde(default)]
    pub creator_id: Option<String>,
    #[serde(default)]
    pub members: Option<Vec<String>>,
    #[serde(default)]
    pub final_members: Option<Vec<String>>,
    #[serde(default)]
    pub pending_members: Option<Vec<String>>,
    #[serde(default)]
    pub max_members: Option<u32>,
    #[serde(default)]
    pub registration_status: Option<RegistrationStatus>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub weekly_calls: Option<u32>,
    #[serde(default)]
    pub call_time: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl GroupRecord {
    /// Apply the display fallbacks: `final_members` then `members` then
    /// empty, capacity 10, status open, empty description.
    pub fn into_group(self) -> Group {
        let final_members = self.final_members.or(self.members).unwrap_or_default();
        Group {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            prep_type: self.prep_type.unwrap_or(PrepType::Other),
            creator_id: self.creator_id.filter(|c| !c.is_empty()),
            final_members,
            pending_members: self.pending_members.unwrap_or_default(),
            max_members: self.max_members.unwrap_or(DEFAULT_MAX_MEMBERS),
            registration_status: self.registration_status.unwrap_or_default(),
            goal: non_blank(self.goal),
            start_date: self.start_date.as_deref().and_then(parse_date),
            end_date: self.end_date.as_deref().and_then(parse_date),
            requirements: non_blank(self.requirements),
            timezone: non_blank(self.timezone),
            weekly_calls: self.weekly_calls,
            call_time: non_blank(self.call_time),
            created_at: non_blank(self.created_at),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accept `YYYY-MM-DD` or anything that starts with it (ISO timestamps).
fn parse_date(value: &str) -> Option<NaiveDate> {
    let date: String = value.trim().chars().take(10).collect();
    NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()
}

/// A study group after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: String,
    pub prep_type: PrepType,
    pub creator_id: Option<String>,
    pub final_members: Vec<String>,
    pub pending_members: Vec<String>,
    pub max_members: u32,
    pub registration_status: RegistrationStatus,
    pub goal: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub requirements: Option<String>,
    pub timezone: Option<String>,
    pub weekly_calls: Option<u32>,
    pub call_time: Option<String>,
    pub created_at: Option<String>,
}

impl Group {
    pub fn member_count(&self) -> usize {
        self.final_members.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending_members.len()
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.final_members.iter().any(|m| m == user_id)
    }

    pub fn is_pending(&self, user_id: &str) -> bool {
        self.pending_members.iter().any(|m| m == user_id)
    }

    pub fn is_creator(&self, user_id: &str) -> bool {
        self.creator_id.as_deref() == Some(user_id)
    }

    pub fn is_full(&self) -> bool {
        self.registration_status == RegistrationStatus::Full
            || self.member_count() >= self.max_members as usize
    }

    pub fn display_member_count(&self) -> String {
        match self.member_count() {
            1 => "1 member".to_string(),
            n => format!("{} members", n),
        }
    }

    /// "3/10 members", as shown on the manage view
    pub fn display_capacity(&self) -> String {
        format!("{}/{} members", self.member_count(), self.max_members)
    }
}

/// Input for creating a group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub prep_type: PrepType,
    pub goal: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub requirements: Option<String>,
    pub timezone: Option<String>,
    pub weekly_calls: Option<u32>,
    pub call_start_time: Option<NaiveTime>,
    pub call_end_time: Option<NaiveTime>,
    pub max_members: Option<u32>,
    pub user_id: Option<String>,
}

/// Request body for `POST /groups`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: String,
    pub prep_type: PrepType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_calls: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_members: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl NewGroup {
    pub fn new(name: &str, prep_type: PrepType) -> Self {
        Self {
            name: name.to_string(),
            prep_type,
            ..Default::default()
        }
    }

    /// `"HH:MM - HH:MM"` when both call times are set
    pub fn call_time(&self) -> Option<String> {
        match (self.call_start_time, self.call_end_time) {
            (Some(start), Some(end)) => {
                Some(format!("{} - {}", start.format("%H:%M"), end.format("%H:%M")))
            }
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Group name is required".to_string()));
        }
        if self.max_members == Some(0) {
            return Err(ApiError::Validation(
                "Max members must be at least 1".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ApiError::Validation(
                    "End date cannot be before start date".to_string(),
                ));
            }
        }
        if self.call_start_time.is_some() != self.call_end_time.is_some() {
            return Err(ApiError::Validation(
                "Call start and end time must be given together".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate and build the request body
    pub fn to_request(&self) -> Result<CreateGroupRequest, ApiError> {
        self.validate()?;
        Ok(CreateGroupRequest {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            prep_type: self.prep_type,
            goal: non_blank(self.goal.clone()),
            start_date: self.start_date,
            end_date: self.end_date,
            requirements: non_blank(self.requirements.clone()),
            timezone: non_blank(self.timezone.clone()),
            weekly_calls: self.weekly_calls,
            call_time: self.call_time(),
            max_members: self.max_members,
            user_id: self.user_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> GroupRecord {
        serde_json::from_str(json).expect("Failed to parse group test JSON")
    }

    #[test]
    fn test_member_fallback_chain() {
        let g = record(r#"{"id": "g1", "final_members": ["a", "b"], "members": ["x"]}"#).into_group();
        assert_eq!(g.final_members, vec!["a", "b"]);

        let g = record(r#"{"id": "g1", "members": ["x"]}"#).into_group();
        assert_eq!(g.member_count(), 1);
        assert!(g.is_member("x"));

        let g = record(r#"{"id": "g1"}"#).into_group();
        assert_eq!(g.member_count(), 0);
        assert_eq!(g.pending_count(), 0);
    }

    #[test]
    fn test_defaults_for_basic_group() {
        let g = record(
            r#"{"id": "g1", "name": "Grind", "description": null, "prep_type": "AWS_CERT",
                "creator_id": "u1", "members": ["u1"], "created_at": "2024-03-01T10:00:00"}"#,
        )
        .into_group();
        assert_eq!(g.name, "Grind");
        assert_eq!(g.description, "");
        assert_eq!(g.prep_type, PrepType::AwsCert);
        assert_eq!(g.max_members, DEFAULT_MAX_MEMBERS);
        assert_eq!(g.registration_status, RegistrationStatus::Open);
        assert!(g.is_creator("u1"));
        assert!(!g.is_creator("u2"));
        assert_eq!(g.display_member_count(), "1 member");
        assert_eq!(g.display_capacity(), "1/10 members");
    }

    #[test]
    fn test_extended_fields() {
        let g = record(
            r#"{"id": "g2", "name": "SD", "prep_type": "SYSTEM_DESIGN", "final_members": [],
                "pending_members": ["p1"], "max_members": 4, "registration_status": "full",
                "goal": "  ", "start_date": "2024-05-01", "end_date": "2024-06-01T00:00:00Z",
                "weekly_calls": 2, "call_time": "18:00 - 19:00", "timezone": "UTC"}"#,
        )
        .into_group();
        assert_eq!(g.goal, None);
        assert_eq!(g.start_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(g.end_date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert!(g.is_pending("p1"));
        assert!(g.is_full());
        assert_eq!(g.registration_status.label(), "FULL");
        assert_eq!(g.display_member_count(), "0 members");
    }

    #[test]
    fn test_unknown_enum_values() {
        let g = record(r#"{"prep_type": "LEETCODE", "registration_status": "archived"}"#).into_group();
        assert_eq!(g.prep_type, PrepType::Other);
        assert_eq!(g.registration_status, RegistrationStatus::Unknown);

        let g = record(r#"{"start_date": "next week"}"#).into_group();
        assert_eq!(g.start_date, None);
    }

    #[test]
    fn test_is_full_by_capacity() {
        let g = record(r#"{"final_members": ["a", "b"], "max_members": 2}"#).into_group();
        assert_eq!(g.registration_status, RegistrationStatus::Open);
        assert!(g.is_full());
    }

    #[test]
    fn test_prep_type_parse_and_labels() {
        assert_eq!(PrepType::parse("aws_cert"), Some(PrepType::AwsCert));
        assert_eq!(PrepType::parse(" FAANG "), Some(PrepType::Faang));
        assert_eq!(PrepType::parse("nope"), None);
        assert_eq!(PrepType::GcpCert.label(), "GCP Certification");
        assert_eq!(PrepType::SystemDesign.to_string(), "SYSTEM_DESIGN");
        assert_eq!(
            serde_json::to_string(&PrepType::AzureCert).unwrap(),
            r#""AZURE_CERT""#
        );
    }

    #[test]
    fn test_call_time_composition() {
        let mut g = NewGroup::new("Night owls", PrepType::Faang);
        assert_eq!(g.call_time(), None);

        g.call_start_time = NaiveTime::from_hms_opt(18, 0, 0);
        g.call_end_time = NaiveTime::from_hms_opt(19, 30, 0);
        assert_eq!(g.call_time().as_deref(), Some("18:00 - 19:30"));

        let req = g.to_request().unwrap();
        assert_eq!(req.call_time.as_deref(), Some("18:00 - 19:30"));
    }

    #[test]
    fn test_new_group_validation() {
        let g = NewGroup::new("   ", PrepType::Faang);
        assert!(matches!(g.validate(), Err(ApiError::Validation(_))));

        let mut g = NewGroup::new("Study", PrepType::Faang);
        g.max_members = Some(0);
        assert!(g.validate().is_err());

        let mut g = NewGroup::new("Study", PrepType::Faang);
        g.start_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        g.end_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert!(g.validate().is_err());

        let mut g = NewGroup::new("Study", PrepType::Faang);
        g.call_start_time = NaiveTime::from_hms_opt(9, 0, 0);
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_create_request_body() {
        let mut g = NewGroup::new(" Cloud crew ", PrepType::GcpCert);
        g.description = "ACE exam".to_string();
        g.user_id = Some("u1".to_string());
        g.max_members = Some(6);
        g.start_date = NaiveDate::from_ymd_opt(2024, 1, 15);

        let body = serde_json::to_value(g.to_request().unwrap()).unwrap();
        assert_eq!(body["name"], "Cloud crew");
        assert_eq!(body["prep_type"], "GCP_CERT");
        assert_eq!(body["max_members"], 6);
        assert_eq!(body["start_date"], "2024-01-15");
        assert_eq!(body["user_id"], "u1");
        assert!(body.get("call_time").is_none());
        assert!(body.get("goal").is_none());
    }
}
