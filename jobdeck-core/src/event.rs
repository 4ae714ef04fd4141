//! Local calendar event types.
//!
//! Events belong to exactly one user and are mutated only through explicit
//! edits or the sync pull path. Providers never see these types directly;
//! `google::convert` translates them to and from the wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of job-search appointment an event represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Interview,
    FollowUp,
    Deadline,
    Other,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Interview => "interview",
            EventCategory::FollowUp => "follow_up",
            EventCategory::Deadline => "deadline",
            EventCategory::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "interview" => Some(EventCategory::Interview),
            "follow_up" => Some(EventCategory::FollowUp),
            "deadline" => Some(EventCategory::Deadline),
            "other" => Some(EventCategory::Other),
            _ => None,
        }
    }

    /// Guess a category from an event title.
    ///
    /// Last-resort heuristic for external events that carry no explicit
    /// category. Callers must record that the result was inferred.
    pub fn infer_from_title(title: &str) -> Self {
        let lower = title.to_lowercase();
        if lower.contains("interview") {
            EventCategory::Interview
        } else if lower.contains("follow") {
            EventCategory::FollowUp
        } else if lower.contains("deadline") {
            EventCategory::Deadline
        } else {
            EventCategory::Other
        }
    }
}

/// A calendar event owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: EventCategory,
    /// True when the category came from the title heuristic rather than
    /// explicit data; the UI renders these differently.
    pub category_inferred: bool,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub meeting_url: Option<String>,
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    /// Reminder lead time in minutes before `start`.
    pub reminder_minutes: i64,
    pub completed: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// Create a new event with generated id and timestamps.
    pub fn new(user_id: &str, title: &str, category: EventCategory, start: DateTime<Utc>) -> Self {
        let now = Utc::now();
        CalendarEvent {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: None,
            category,
            category_inferred: false,
            start,
            end: None,
            location: None,
            meeting_url: None,
            company: None,
            contact_name: None,
            contact_email: None,
            reminder_minutes: crate::constants::DEFAULT_REMINDER_MINUTES,
            completed: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_category_from_title_substrings() {
        assert_eq!(
            EventCategory::infer_from_title("Final Interview with Acme"),
            EventCategory::Interview
        );
        assert_eq!(
            EventCategory::infer_from_title("follow-up call"),
            EventCategory::FollowUp
        );
        assert_eq!(
            EventCategory::infer_from_title("Application DEADLINE"),
            EventCategory::Deadline
        );
        assert_eq!(
            EventCategory::infer_from_title("Lunch"),
            EventCategory::Other
        );
    }

    #[test]
    fn category_str_roundtrip() {
        for cat in [
            EventCategory::Interview,
            EventCategory::FollowUp,
            EventCategory::Deadline,
            EventCategory::Other,
        ] {
            assert_eq!(EventCategory::from_str(cat.as_str()), Some(cat));
        }
    }
}
