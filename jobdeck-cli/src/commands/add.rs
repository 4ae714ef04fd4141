use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDateTime, Utc};
use owo_colors::OwoColorize;

use jobdeck_core::google::GoogleCalendarApi;
use jobdeck_core::oauth::{self, OAuthApp, TokenClient};
use jobdeck_core::{CalendarEvent, EventCategory, Store, SyncEngine};

use super::open_store;

pub struct AddArgs {
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub category: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub reminder: Option<i64>,
    pub notes: Option<String>,
}

pub async fn run(user_id: &str, args: AddArgs) -> Result<()> {
    let category = EventCategory::from_str(&args.category)
        .with_context(|| format!("Unknown category '{}'. Use interview, follow_up, deadline or other", args.category))?;

    let start = parse_datetime(&args.start)?;
    let end = args.end.as_deref().map(parse_datetime).transpose()?;
    if let Some(end) = end {
        if end <= start {
            bail!("End must be after start");
        }
    }

    let store = open_store()?;

    let mut event = CalendarEvent::new(user_id, &args.title, category, start);
    event.end = end;
    event.company = args.company;
    event.location = args.location;
    event.notes = args.notes;
    if let Some(reminder) = args.reminder {
        event.reminder_minutes = reminder;
    }

    store.insert_event(&event)?;
    println!("Added {} ({})", event.title.bold(), event.id.dimmed());

    auto_push(&store, user_id, &event.id).await;

    Ok(())
}

/// Best-effort push of the new event when auto-sync applies. Failures are
/// reported but never fail the add.
async fn auto_push(store: &Store, user_id: &str, event_id: &str) {
    let connected = matches!(store.credentials(user_id), Ok(Some(ref r)) if r.sync_enabled);
    if !connected {
        return;
    }

    let result = async {
        let client = TokenClient::new(OAuthApp::load()?);
        let record = oauth::valid_credentials(store, &client, user_id).await?;
        let api = GoogleCalendarApi::new(record.access_token.clone());
        SyncEngine::new(store, &api, user_id, &record.calendar_id)
            .push_single(event_id)
            .await
    }
    .await;

    match result {
        Ok(report) if report.errors == 0 => {
            println!("{}", "Synced to Google Calendar.".dimmed());
        }
        Ok(_) => {
            println!("{}", "Auto-sync failed; run `jobdeck sync` to retry.".dimmed());
        }
        Err(e) => {
            println!("{}", format!("Auto-sync skipped: {e}").dimmed());
        }
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .with_context(|| format!("Invalid date/time '{s}'. Expected YYYY-MM-DDTHH:MM"))?;
    Ok(naive.and_utc())
}
