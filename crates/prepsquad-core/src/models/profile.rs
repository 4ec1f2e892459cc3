use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Profile as returned by the API; any field may be missing or null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileRecord {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub prep_goals: Option<Vec<String>>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
}

impl ProfileRecord {
    pub fn into_profile(self) -> Profile {
        Profile {
            user_id: self.user_id,
            bio: self.bio.unwrap_or_default(),
            avatar_url: self.avatar_url.unwrap_or_default(),
            skills: tag_set(self.skills.unwrap_or_default()),
            prep_goals: tag_set(self.prep_goals.unwrap_or_default()),
            linkedin_url: self.linkedin_url.unwrap_or_default(),
            github_url: self.github_url.unwrap_or_default(),
        }
    }
}

/// Trim, drop blanks and dedupe a list of free-form tags
fn tag_set<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Profile {
    pub user_id: Option<String>,
    pub bio: String,
    pub avatar_url: String,
    pub skills: BTreeSet<String>,
    pub prep_goals: BTreeSet<String>,
    pub linkedin_url: String,
    pub github_url: String,
}

/// Request body for `PUT /users/profile`. The whole profile is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProfileUpdate {
    pub bio: String,
    pub avatar_url: String,
    pub skills: BTreeSet<String>,
    pub prep_goals: BTreeSet<String>,
    pub linkedin_url: String,
    pub github_url: String,
}

impl ProfileUpdate {
    pub fn add_skill(&mut self, skill: &str) -> bool {
        let skill = skill.trim();
        !skill.is_empty() && self.skills.insert(skill.to_string())
    }

    pub fn remove_skill(&mut self, skill: &str) -> bool {
        self.skills.remove(skill.trim())
    }

    pub fn add_prep_goal(&mut self, goal: &str) -> bool {
        let goal = goal.trim();
        !goal.is_empty() && self.prep_goals.insert(goal.to_string())
    }

    pub fn remove_prep_goal(&mut self, goal: &str) -> bool {
        self.prep_goals.remove(goal.trim())
    }

    /// Trim free-text fields before sending
    pub fn normalized(mut self) -> Self {
        self.bio = self.bio.trim().to_string();
        self.avatar_url = self.avatar_url.trim().to_string();
        self.linkedin_url = self.linkedin_url.trim().to_string();
        self.github_url = self.github_url.trim().to_string();
        self.skills = tag_set(&self.skills);
        self.prep_goals = tag_set(&self.prep_goals);
        self
    }
}

impl From<&Profile> for ProfileUpdate {
    fn from(profile: &Profile) -> Self {
        Self {
            bio: profile.bio.clone(),
            avatar_url: profile.avatar_url.clone(),
            skills: profile.skills.clone(),
            prep_goals: profile.prep_goals.clone(),
            linkedin_url: profile.linkedin_url.clone(),
            github_url: profile.github_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults_from_nulls() {
        let record: ProfileRecord =
            serde_json::from_str(r#"{"bio": null, "skills": ["rust", " rust ", ""], "github_url": "https://github.com/x"}"#)
                .unwrap();
        let profile = record.into_profile();
        assert_eq!(profile.bio, "");
        assert_eq!(profile.avatar_url, "");
        assert_eq!(profile.skills.len(), 1);
        assert!(profile.skills.contains("rust"));
        assert!(profile.prep_goals.is_empty());
        assert_eq!(profile.github_url, "https://github.com/x");
    }

    #[test]
    fn test_update_from_profile_and_edit() {
        let profile = Profile {
            bio: "hi".to_string(),
            skills: ["go".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let mut update = ProfileUpdate::from(&profile);
        assert!(update.add_skill("rust"));
        assert!(!update.add_skill("rust"));
        assert!(!update.add_skill("  "));
        assert!(update.remove_skill("go"));
        assert!(update.add_prep_goal("AWS SAA"));
        assert!(!update.remove_prep_goal("GCP"));

        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body["skills"], serde_json::json!(["rust"]));
        assert_eq!(body["prep_goals"], serde_json::json!(["AWS SAA"]));
        assert_eq!(body["bio"], "hi");
    }

    #[test]
    fn test_normalized_trims_fields() {
        let update = ProfileUpdate {
            bio: "  hello ".to_string(),
            linkedin_url: " https://linkedin.com/in/x ".to_string(),
            ..Default::default()
        }
        .normalized();
        assert_eq!(update.bio, "hello");
        assert_eq!(update.linkedin_url, "https://linkedin.com/in/x");
    }
}
