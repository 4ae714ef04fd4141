//! Conversion between local events and Google's wire format.
//!
//! Both directions are pure functions. Pushing flattens the job-search
//! fields (company, contact, notes) into the description since Google has
//! no columns for them; the category travels in a private extended
//! property so pull can recover it without guessing from the title.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use crate::constants::{DEFAULT_EVENT_MINUTES, DEFAULT_REMINDER_MINUTES};
use crate::error::{JobdeckError, JobdeckResult};
use crate::event::{CalendarEvent, EventCategory};
use crate::google::{
    CATEGORY_PROPERTY, GoogleEvent, GoogleEventTime, GoogleExtendedProperties, GoogleReminderOverride,
    GoogleReminders,
};

pub fn to_google_event(event: &CalendarEvent) -> GoogleEvent {
    let end = event
        .end
        .unwrap_or(event.start + Duration::minutes(DEFAULT_EVENT_MINUTES));

    let mut private = BTreeMap::new();
    private.insert(
        CATEGORY_PROPERTY.to_string(),
        event.category.as_str().to_string(),
    );

    GoogleEvent {
        id: String::new(),
        status: String::new(),
        summary: event.title.clone(),
        description: synthesize_description(event),
        location: event.location.clone().or_else(|| event.meeting_url.clone()),
        start: Some(utc_time(event.start)),
        end: Some(utc_time(end)),
        reminders: Some(GoogleReminders {
            use_default: false,
            overrides: vec![GoogleReminderOverride {
                method: "popup".to_string(),
                minutes: event.reminder_minutes,
            }],
        }),
        extended_properties: Some(GoogleExtendedProperties { private }),
        updated: None,
    }
}

pub fn from_google_event(user_id: &str, event: &GoogleEvent) -> JobdeckResult<CalendarEvent> {
    let start = event
        .start
        .as_ref()
        .and_then(event_time)
        .ok_or_else(|| JobdeckError::Provider(format!("Event '{}' has no start time", event.id)))?;

    let end = event.end.as_ref().and_then(event_time);

    let title = if event.summary.is_empty() {
        "Untitled Event".to_string()
    } else {
        event.summary.clone()
    };

    // Explicit category from our own extended property beats the heuristic
    let (category, category_inferred) = match event
        .private_category()
        .and_then(EventCategory::from_str)
    {
        Some(category) => (category, false),
        None => (EventCategory::infer_from_title(&title), true),
    };

    let reminder_minutes = event
        .reminders
        .as_ref()
        .and_then(|r| r.overrides.first())
        .map_or(DEFAULT_REMINDER_MINUTES, |o| o.minutes);

    let now = Utc::now();
    Ok(CalendarEvent {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title,
        description: event.description.clone(),
        category,
        category_inferred,
        start,
        end,
        location: event.location.clone(),
        meeting_url: None,
        company: None,
        contact_name: None,
        contact_email: None,
        reminder_minutes,
        completed: false,
        notes: None,
        created_at: now,
        updated_at: now,
    })
}

/// Description plus labeled lines for the job-search fields, newline-joined.
fn synthesize_description(event: &CalendarEvent) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(ref description) = event.description {
        lines.push(description.clone());
    }
    if let Some(ref company) = event.company {
        lines.push(format!("Company: {company}"));
    }
    if let Some(ref contact) = event.contact_name {
        lines.push(format!("Contact: {contact}"));
    }
    if let Some(ref email) = event.contact_email {
        lines.push(format!("Contact email: {email}"));
    }
    if let Some(ref notes) = event.notes {
        lines.push(format!("Notes: {notes}"));
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn utc_time(at: DateTime<Utc>) -> GoogleEventTime {
    GoogleEventTime {
        date: None,
        date_time: Some(at),
        time_zone: "UTC".to_string(),
    }
}

fn event_time(time: &GoogleEventTime) -> Option<DateTime<Utc>> {
    time.date_time
        .or_else(|| time.date.map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local_event() -> CalendarEvent {
        CalendarEvent::new(
            "alice",
            "Final interview",
            EventCategory::Interview,
            Utc.with_ymd_and_hms(2026, 9, 1, 14, 0, 0).unwrap(),
        )
    }

    #[test]
    fn to_google_maps_core_fields() {
        let mut event = local_event();
        event.end = Some(Utc.with_ymd_and_hms(2026, 9, 1, 15, 30, 0).unwrap());
        event.location = Some("HQ, 4th floor".to_string());
        event.reminder_minutes = 15;

        let google = to_google_event(&event);
        assert_eq!(google.summary, "Final interview");
        assert_eq!(google.start.as_ref().unwrap().date_time, Some(event.start));
        assert_eq!(google.end.as_ref().unwrap().date_time, event.end);
        assert_eq!(google.location.as_deref(), Some("HQ, 4th floor"));

        let reminders = google.reminders.as_ref().unwrap();
        assert!(!reminders.use_default);
        assert_eq!(reminders.overrides[0].minutes, 15);
        assert_eq!(google.private_category(), Some("interview"));
    }

    #[test]
    fn to_google_defaults_end_to_one_hour() {
        let event = local_event();
        let google = to_google_event(&event);
        assert_eq!(
            google.end.unwrap().date_time,
            Some(event.start + Duration::minutes(60))
        );
    }

    #[test]
    fn to_google_falls_back_to_meeting_link_location() {
        let mut event = local_event();
        event.meeting_url = Some("https://meet.example.com/xyz".to_string());
        let google = to_google_event(&event);
        assert_eq!(
            google.location.as_deref(),
            Some("https://meet.example.com/xyz")
        );
    }

    #[test]
    fn to_google_synthesizes_labeled_description() {
        let mut event = local_event();
        event.description = Some("Panel round".to_string());
        event.company = Some("Acme".to_string());
        event.contact_email = Some("recruiter@acme.test".to_string());
        event.notes = Some("Bring portfolio".to_string());

        let google = to_google_event(&event);
        assert_eq!(
            google.description.as_deref(),
            Some("Panel round\nCompany: Acme\nContact email: recruiter@acme.test\nNotes: Bring portfolio")
        );

        // No fields set -> no description at all
        let bare = to_google_event(&local_event());
        assert!(bare.description.is_none());
    }

    #[test]
    fn from_google_prefers_explicit_category() {
        let mut google = to_google_event(&local_event());
        google.id = "ext-1".to_string();
        google.summary = "Chat".to_string(); // title would infer Other

        let event = from_google_event("alice", &google).unwrap();
        assert_eq!(event.category, EventCategory::Interview);
        assert!(!event.category_inferred);
    }

    #[test]
    fn from_google_infers_category_from_title_as_fallback() {
        let google = GoogleEvent {
            id: "ext-2".to_string(),
            summary: "Phone interview".to_string(),
            start: Some(utc_time(Utc.with_ymd_and_hms(2026, 9, 2, 10, 0, 0).unwrap())),
            ..Default::default()
        };

        let event = from_google_event("alice", &google).unwrap();
        assert_eq!(event.category, EventCategory::Interview);
        assert!(event.category_inferred);
        assert_eq!(event.reminder_minutes, DEFAULT_REMINDER_MINUTES);
        assert!(!event.completed);
    }

    #[test]
    fn from_google_defaults_title_and_handles_all_day() {
        let google = GoogleEvent {
            id: "ext-3".to_string(),
            start: Some(GoogleEventTime {
                date: Some(chrono::NaiveDate::from_ymd_opt(2026, 9, 15).unwrap()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let event = from_google_event("alice", &google).unwrap();
        assert_eq!(event.title, "Untitled Event");
        assert_eq!(
            event.start,
            Utc.with_ymd_and_hms(2026, 9, 15, 0, 0, 0).unwrap()
        );
        assert!(event.end.is_none());
    }

    #[test]
    fn from_google_requires_a_start() {
        let google = GoogleEvent {
            id: "ext-4".to_string(),
            summary: "Broken".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            from_google_event("alice", &google),
            Err(JobdeckError::Provider(_))
        ));
    }

    #[test]
    fn roundtrip_preserves_title_start_end() {
        let mut event = local_event();
        event.end = Some(Utc.with_ymd_and_hms(2026, 9, 1, 16, 0, 0).unwrap());

        let back = from_google_event("alice", &to_google_event(&event)).unwrap();
        assert_eq!(back.title, event.title);
        assert_eq!(back.start, event.start);
        assert_eq!(back.end, event.end);
        assert_eq!(back.category, event.category);
    }
}
