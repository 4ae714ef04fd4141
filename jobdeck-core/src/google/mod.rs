//! Google Calendar v3 REST client and wire types.
//!
//! The sync engine only depends on the `CalendarApi` trait; the reqwest
//! implementation here is the production provider, tests substitute mocks.

pub mod convert;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{JobdeckError, JobdeckResult};

const API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Extended-property key carrying the jobdeck category across the wire.
pub const CATEGORY_PROPERTY: &str = "jobdeck_category";

/// A Google Calendar event, limited to the fields jobdeck reads or writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleEvent {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<GoogleEventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<GoogleEventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminders: Option<GoogleReminders>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<GoogleExtendedProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl GoogleEvent {
    /// The jobdeck category stored in the event's private extended
    /// properties, if any.
    pub fn private_category(&self) -> Option<&str> {
        self.extended_properties
            .as_ref()
            .and_then(|props| props.private.get(CATEGORY_PROPERTY))
            .map(String::as_str)
    }
}

/// Either an all-day date or a timezone-qualified timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub time_zone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleReminders {
    pub use_default: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<GoogleReminderOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleReminderOverride {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub method: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleExtendedProperties {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub private: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EventsPage {
    items: Vec<GoogleEvent>,
    next_page_token: Option<String>,
}

/// Remote calendar operations the sync engine performs.
#[allow(async_fn_in_trait)]
pub trait CalendarApi {
    /// Events with a start inside `[time_min, time_max)`.
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> JobdeckResult<Vec<GoogleEvent>>;

    /// Create an event, returning it with the provider-assigned id.
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &GoogleEvent,
    ) -> JobdeckResult<GoogleEvent>;

    /// Update an existing event in place.
    async fn patch_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &GoogleEvent,
    ) -> JobdeckResult<GoogleEvent>;
}

/// reqwest-backed Google Calendar client using a Bearer access token.
pub struct GoogleCalendarApi {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GoogleCalendarApi {
    pub fn new(access_token: String) -> Self {
        GoogleCalendarApi {
            http: reqwest::Client::new(),
            access_token,
            base_url: API_BASE_URL.to_string(),
        }
    }

    async fn check(response: reqwest::Response) -> JobdeckResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JobdeckError::Provider(format!("{status}: {body}")));
        }
        Ok(response)
    }
}

impl CalendarApi for GoogleCalendarApi {
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> JobdeckResult<Vec<GoogleEvent>> {
        let url = format!("{}/calendars/{}/events", self.base_url, calendar_id);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("timeMin", time_min.to_rfc3339()),
                    ("timeMax", time_max.to_rfc3339()),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                    ("maxResults", "2500".to_string()),
                ]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = Self::check(request.send().await?).await?;
            let page: EventsPage = response.json().await?;

            // Cancelled tombstones and idless items carry nothing to sync
            events.extend(
                page.items
                    .into_iter()
                    .filter(|e| e.status != "cancelled" && !e.id.is_empty()),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }

    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &GoogleEvent,
    ) -> JobdeckResult<GoogleEvent> {
        let url = format!("{}/calendars/{}/events", self.base_url, calendar_id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(event)
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn patch_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &GoogleEvent,
    ) -> JobdeckResult<GoogleEvent> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url, calendar_id, event_id
        );

        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.access_token)
            .json(event)
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_event_serializes_camel_case_and_omits_empty() {
        let mut private = BTreeMap::new();
        private.insert(CATEGORY_PROPERTY.to_string(), "interview".to_string());

        let event = GoogleEvent {
            summary: "Interview".to_string(),
            start: Some(GoogleEventTime {
                date_time: Some("2026-09-01T14:00:00Z".parse().unwrap()),
                time_zone: "UTC".to_string(),
                ..Default::default()
            }),
            extended_properties: Some(GoogleExtendedProperties { private }),
            ..Default::default()
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["summary"], "Interview");
        assert_eq!(json["start"]["timeZone"], "UTC");
        assert_eq!(
            json["extendedProperties"]["private"]["jobdeck_category"],
            "interview"
        );
        // Empty id must not be sent on insert
        assert!(json.get("id").is_none());
        assert!(json.get("description").is_none());
    }

    #[test]
    fn google_event_deserializes_date_only_payload() {
        let event: GoogleEvent = serde_json::from_str(
            r#"{
                "id": "abc123",
                "status": "confirmed",
                "summary": "Application deadline",
                "start": {"date": "2026-09-15"},
                "end": {"date": "2026-09-16"}
            }"#,
        )
        .unwrap();

        assert_eq!(event.id, "abc123");
        assert_eq!(
            event.start.unwrap().date,
            Some(NaiveDate::from_ymd_opt(2026, 9, 15).unwrap())
        );
        assert!(event.reminders.is_none());
    }
}
