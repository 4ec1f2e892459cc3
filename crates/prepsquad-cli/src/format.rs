//! Plain-text rendering for terminal output.

use chrono::{DateTime, NaiveDate, Utc};
use prepsquad_core::models::{Group, Profile, User};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a date as "Jan 05, 2024"
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Relative age of a timestamp, e.g. "5m ago", "2h ago", "3d ago"
pub fn format_age(at: DateTime<Utc>) -> String {
    let minutes = (Utc::now() - at).num_minutes();
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// Membership badge for the group list from one user's point of view
pub fn membership_badge(group: &Group, user: Option<&User>) -> &'static str {
    match user {
        Some(u) if group.is_creator(&u.id) => "[Creator]",
        Some(u) if group.is_member(&u.id) => "[Joined]",
        Some(u) if group.is_pending(&u.id) => "[Pending]",
        _ if group.is_full() => "[Full]",
        _ => "",
    }
}

/// One block per group for `groups list`
pub fn group_summary(group: &Group, user: Option<&User>) -> String {
    let mut out = format!(
        "{}  {} ({})  {}",
        group.id,
        group.name,
        group.prep_type.label(),
        group.display_member_count()
    );
    let badge = membership_badge(group, user);
    if !badge.is_empty() {
        out.push(' ');
        out.push_str(badge);
    }
    if !group.description.is_empty() {
        out.push_str(&format!("\n    {}", truncate_string(&group.description, 72)));
    }
    out
}

/// Full view of a group for the creator's manage screen
pub fn group_details(group: &Group) -> String {
    let mut lines = vec![
        format!("{} [{}]", group.name, group.registration_status.label()),
        format!("  id:       {}", group.id),
        format!("  type:     {}", group.prep_type.label()),
        format!("  members:  {}", group.display_capacity()),
    ];
    if let Some(ref goal) = group.goal {
        lines.push(format!("  goal:     {}", goal));
    }
    match (group.start_date, group.end_date) {
        (Some(start), Some(end)) => {
            lines.push(format!("  dates:    {} - {}", format_date(start), format_date(end)))
        }
        (Some(start), None) => lines.push(format!("  starts:   {}", format_date(start))),
        (None, Some(end)) => lines.push(format!("  ends:     {}", format_date(end))),
        (None, None) => {}
    }
    if let Some(ref call_time) = group.call_time {
        let tz = group.timezone.as_deref().unwrap_or("");
        let calls = group
            .weekly_calls
            .map(|n| format!("{}x weekly, ", n))
            .unwrap_or_default();
        lines.push(format!("  calls:    {}{} {}", calls, call_time, tz).trim_end().to_string());
    }
    if let Some(ref requirements) = group.requirements {
        lines.push(format!("  requires: {}", requirements));
    }
    if !group.pending_members.is_empty() {
        lines.push(format!("  pending approval ({}):", group.pending_count()));
        lines.extend(group.pending_members.iter().map(|m| format!("    - {}", m)));
    }
    if !group.final_members.is_empty() {
        lines.push(format!("  final members ({}):", group.member_count()));
        lines.extend(group.final_members.iter().map(|m| format!("    - {}", m)));
    }
    lines.join("\n")
}

fn join_tags<'a>(tags: impl IntoIterator<Item = &'a String>) -> String {
    let tags: Vec<&str> = tags.into_iter().map(String::as_str).collect();
    if tags.is_empty() {
        "-".to_string()
    } else {
        tags.join(", ")
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

pub fn profile_details(profile: &Profile) -> String {
    [
        format!("bio:        {}", or_dash(&profile.bio)),
        format!("avatar:     {}", or_dash(&profile.avatar_url)),
        format!("skills:     {}", join_tags(&profile.skills)),
        format!("prep goals: {}", join_tags(&profile.prep_goals)),
        format!("linkedin:   {}", or_dash(&profile.linkedin_url)),
        format!("github:     {}", or_dash(&profile.github_url)),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prepsquad_core::models::GroupRecord;

    fn group(json: &str) -> Group {
        serde_json::from_str::<GroupRecord>(json).unwrap().into_group()
    }

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: id.to_string(),
        }
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("héllo wörld", 6), "hél...");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Utc::now()), "just now");
        assert_eq!(format_age(Utc::now() + Duration::minutes(5)), "just now");
        assert_eq!(format_age(Utc::now() - Duration::minutes(5)), "5m ago");
        assert_eq!(format_age(Utc::now() - Duration::minutes(95)), "2h ago");
        assert_eq!(format_age(Utc::now() - Duration::days(3)), "3d ago");
    }

    #[test]
    fn test_membership_badge() {
        let g = group(r#"{"id": "g1", "creator_id": "c", "final_members": ["c", "m"], "pending_members": ["p"]}"#);
        assert_eq!(membership_badge(&g, Some(&user("c"))), "[Creator]");
        assert_eq!(membership_badge(&g, Some(&user("m"))), "[Joined]");
        assert_eq!(membership_badge(&g, Some(&user("p"))), "[Pending]");
        assert_eq!(membership_badge(&g, Some(&user("x"))), "");
        assert_eq!(membership_badge(&g, None), "");

        let full = group(r#"{"id": "g2", "final_members": ["a"], "max_members": 1}"#);
        assert_eq!(membership_badge(&full, Some(&user("x"))), "[Full]");
    }

    #[test]
    fn test_group_summary() {
        let g = group(r#"{"id": "g1", "name": "SAA", "prep_type": "AWS_CERT", "members": ["a"], "description": "Weekly"}"#);
        let text = group_summary(&g, Some(&user("a")));
        assert_eq!(text, "g1  SAA (AWS Certification)  1 member [Joined]\n    Weekly");
    }

    #[test]
    fn test_group_details() {
        let g = group(
            r#"{"id": "g1", "name": "SD", "prep_type": "SYSTEM_DESIGN", "final_members": ["a"],
                "pending_members": ["b"], "start_date": "2024-01-05", "call_time": "18:00 - 19:00",
                "weekly_calls": 2, "timezone": "UTC"}"#,
        );
        let text = group_details(&g);
        assert!(text.starts_with("SD [OPEN]"));
        assert!(text.contains("members:  1/10 members"));
        assert!(text.contains("starts:   Jan 05, 2024"));
        assert!(text.contains("calls:    2x weekly, 18:00 - 19:00 UTC"));
        assert!(text.contains("pending approval (1):\n    - b"));
    }

    #[test]
    fn test_profile_details() {
        let profile = Profile {
            bio: "Hi".to_string(),
            skills: ["rust".to_string(), "go".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let text = profile_details(&profile);
        assert!(text.contains("bio:        Hi"));
        assert!(text.contains("skills:     go, rust"));
        assert!(text.contains("prep goals: -"));
    }
}
