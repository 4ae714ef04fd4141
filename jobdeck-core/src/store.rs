//! SQLite-backed storage for events, sync ledger entries and credentials.
//!
//! Every table carries a `user_id` column and every query is scoped by it,
//! mirroring the row-level ownership the hosted product enforces. Timestamps
//! are stored as RFC 3339 text.

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;

use crate::constants::STALE_LOCK_MINUTES;
use crate::credentials::CredentialRecord;
use crate::error::{JobdeckError, JobdeckResult};
use crate::event::{CalendarEvent, EventCategory};
use crate::ledger::{LedgerEntry, SyncDirection};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
    id                TEXT PRIMARY KEY,
    user_id           TEXT NOT NULL,
    title             TEXT NOT NULL,
    description       TEXT,
    category          TEXT NOT NULL,
    category_inferred INTEGER NOT NULL DEFAULT 0,
    start_at          TEXT NOT NULL,
    end_at            TEXT,
    location          TEXT,
    meeting_url       TEXT,
    company           TEXT,
    contact_name      TEXT,
    contact_email     TEXT,
    reminder_minutes  INTEGER NOT NULL DEFAULT 60,
    completed         INTEGER NOT NULL DEFAULT 0,
    notes             TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_user_start ON events(user_id, start_at);

CREATE TABLE IF NOT EXISTS sync_ledger (
    user_id           TEXT NOT NULL,
    event_id          TEXT NOT NULL UNIQUE,
    external_event_id TEXT NOT NULL,
    direction         TEXT NOT NULL,
    last_synced_at    TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_external
    ON sync_ledger(user_id, external_event_id);

CREATE TABLE IF NOT EXISTS credentials (
    user_id      TEXT PRIMARY KEY,
    access_token TEXT NOT NULL,
    refresh_token TEXT NOT NULL,
    token_expiry TEXT NOT NULL,
    sync_enabled INTEGER NOT NULL DEFAULT 1,
    calendar_id  TEXT NOT NULL DEFAULT 'primary',
    last_sync_at TEXT
);

CREATE TABLE IF NOT EXISTS sync_locks (
    user_id     TEXT PRIMARY KEY,
    acquired_at TEXT NOT NULL
);
";

/// Handle to the jobdeck database.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (and migrate) the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> JobdeckResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Store { conn })
    }

    /// Open an in-memory database (primarily for tests).
    pub fn open_in_memory() -> JobdeckResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Store { conn })
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn insert_event(&self, event: &CalendarEvent) -> JobdeckResult<()> {
        self.conn.execute(
            "INSERT INTO events (
                id, user_id, title, description, category, category_inferred,
                start_at, end_at, location, meeting_url, company, contact_name,
                contact_email, reminder_minutes, completed, notes, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                event.id,
                event.user_id,
                event.title,
                event.description,
                event.category.as_str(),
                event.category_inferred,
                event.start.to_rfc3339(),
                event.end.map(|dt| dt.to_rfc3339()),
                event.location,
                event.meeting_url,
                event.company,
                event.contact_name,
                event.contact_email,
                event.reminder_minutes,
                event.completed,
                event.notes,
                event.created_at.to_rfc3339(),
                event.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn update_event(&self, event: &CalendarEvent) -> JobdeckResult<()> {
        let changed = self.conn.execute(
            "UPDATE events SET
                title = ?1, description = ?2, category = ?3, category_inferred = ?4,
                start_at = ?5, end_at = ?6, location = ?7, meeting_url = ?8,
                company = ?9, contact_name = ?10, contact_email = ?11,
                reminder_minutes = ?12, completed = ?13, notes = ?14, updated_at = ?15
             WHERE user_id = ?16 AND id = ?17",
            params![
                event.title,
                event.description,
                event.category.as_str(),
                event.category_inferred,
                event.start.to_rfc3339(),
                event.end.map(|dt| dt.to_rfc3339()),
                event.location,
                event.meeting_url,
                event.company,
                event.contact_name,
                event.contact_email,
                event.reminder_minutes,
                event.completed,
                event.notes,
                Utc::now().to_rfc3339(),
                event.user_id,
                event.id,
            ],
        )?;
        if changed == 0 {
            return Err(JobdeckError::EventNotFound(event.id.clone()));
        }
        Ok(())
    }

    pub fn mark_completed(&self, user_id: &str, event_id: &str, done: bool) -> JobdeckResult<()> {
        let changed = self.conn.execute(
            "UPDATE events SET completed = ?1, updated_at = ?2 WHERE user_id = ?3 AND id = ?4",
            params![done, Utc::now().to_rfc3339(), user_id, event_id],
        )?;
        if changed == 0 {
            return Err(JobdeckError::EventNotFound(event_id.to_string()));
        }
        Ok(())
    }

    /// Delete an event and its ledger row in one transaction.
    ///
    /// Invariant: an event may never be deleted while its ledger pairing
    /// survives, or the next pull re-imports the external copy.
    pub fn delete_event(&self, user_id: &str, event_id: &str) -> JobdeckResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM sync_ledger WHERE user_id = ?1 AND event_id = ?2",
            params![user_id, event_id],
        )?;
        let deleted = tx.execute(
            "DELETE FROM events WHERE user_id = ?1 AND id = ?2",
            params![user_id, event_id],
        )?;
        tx.commit()?;
        if deleted == 0 {
            return Err(JobdeckError::EventNotFound(event_id.to_string()));
        }
        Ok(())
    }

    pub fn get_event(&self, user_id: &str, event_id: &str) -> JobdeckResult<Option<CalendarEvent>> {
        let event = self
            .conn
            .query_row(
                "SELECT id, user_id, title, description, category, category_inferred,
                        start_at, end_at, location, meeting_url, company, contact_name,
                        contact_email, reminder_minutes, completed, notes, created_at, updated_at
                 FROM events WHERE user_id = ?1 AND id = ?2",
                params![user_id, event_id],
                row_to_event,
            )
            .optional()?;
        Ok(event)
    }

    /// All events for a user, ordered by start time.
    pub fn list_events(&self, user_id: &str) -> JobdeckResult<Vec<CalendarEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, description, category, category_inferred,
                    start_at, end_at, location, meeting_url, company, contact_name,
                    contact_email, reminder_minutes, completed, notes, created_at, updated_at
             FROM events WHERE user_id = ?1 ORDER BY start_at",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    pub fn count_events(&self, user_id: &str) -> JobdeckResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM events WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Sync ledger
    // ------------------------------------------------------------------

    pub fn ledger_for_event(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> JobdeckResult<Option<LedgerEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT user_id, event_id, external_event_id, direction, last_synced_at
                 FROM sync_ledger WHERE user_id = ?1 AND event_id = ?2",
                params![user_id, event_id],
                row_to_ledger_entry,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn ledger_for_external(
        &self,
        user_id: &str,
        external_event_id: &str,
    ) -> JobdeckResult<Option<LedgerEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT user_id, event_id, external_event_id, direction, last_synced_at
                 FROM sync_ledger WHERE user_id = ?1 AND external_event_id = ?2",
                params![user_id, external_event_id],
                row_to_ledger_entry,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn upsert_ledger(&self, entry: &LedgerEntry) -> JobdeckResult<()> {
        self.conn.execute(
            "INSERT INTO sync_ledger (user_id, event_id, external_event_id, direction, last_synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(event_id) DO UPDATE SET
                external_event_id = excluded.external_event_id,
                direction = excluded.direction,
                last_synced_at = excluded.last_synced_at",
            params![
                entry.user_id,
                entry.event_id,
                entry.external_event_id,
                entry.direction.as_str(),
                entry.last_synced_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Refresh the last-synced timestamp after a successful push update.
    pub fn touch_ledger(&self, user_id: &str, event_id: &str) -> JobdeckResult<()> {
        self.conn.execute(
            "UPDATE sync_ledger SET last_synced_at = ?1 WHERE user_id = ?2 AND event_id = ?3",
            params![Utc::now().to_rfc3339(), user_id, event_id],
        )?;
        Ok(())
    }

    pub fn delete_ledger_for_user(&self, user_id: &str) -> JobdeckResult<()> {
        self.conn.execute(
            "DELETE FROM sync_ledger WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    pub fn count_ledger(&self, user_id: &str) -> JobdeckResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM sync_ledger WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------

    pub fn credentials(&self, user_id: &str) -> JobdeckResult<Option<CredentialRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT user_id, access_token, refresh_token, token_expiry,
                        sync_enabled, calendar_id, last_sync_at
                 FROM credentials WHERE user_id = ?1",
                params![user_id],
                row_to_credentials,
            )
            .optional()?;
        Ok(record)
    }

    pub fn upsert_credentials(&self, record: &CredentialRecord) -> JobdeckResult<()> {
        self.conn.execute(
            "INSERT INTO credentials (
                user_id, access_token, refresh_token, token_expiry,
                sync_enabled, calendar_id, last_sync_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_expiry = excluded.token_expiry,
                sync_enabled = excluded.sync_enabled,
                calendar_id = excluded.calendar_id,
                last_sync_at = excluded.last_sync_at",
            params![
                record.user_id,
                record.access_token,
                record.refresh_token,
                record.token_expiry.to_rfc3339(),
                record.sync_enabled,
                record.calendar_id,
                record.last_sync_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn delete_credentials(&self, user_id: &str) -> JobdeckResult<()> {
        self.conn.execute(
            "DELETE FROM credentials WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    pub fn set_sync_enabled(&self, user_id: &str, enabled: bool) -> JobdeckResult<()> {
        let changed = self.conn.execute(
            "UPDATE credentials SET sync_enabled = ?1 WHERE user_id = ?2",
            params![enabled, user_id],
        )?;
        if changed == 0 {
            return Err(JobdeckError::NotConnected(user_id.to_string()));
        }
        Ok(())
    }

    pub fn set_last_sync(&self, user_id: &str, at: DateTime<Utc>) -> JobdeckResult<()> {
        self.conn.execute(
            "UPDATE credentials SET last_sync_at = ?1 WHERE user_id = ?2",
            params![at.to_rfc3339(), user_id],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Advisory sync lock
    // ------------------------------------------------------------------

    /// Claim the per-user sync lock, stealing locks left behind by dead
    /// processes. Fails with `SyncInProgress` when another sync holds it.
    pub fn try_acquire_sync_lock(&self, user_id: &str) -> JobdeckResult<()> {
        let stale_cutoff = (Utc::now() - Duration::minutes(STALE_LOCK_MINUTES)).to_rfc3339();
        self.conn.execute(
            "DELETE FROM sync_locks WHERE user_id = ?1 AND acquired_at < ?2",
            params![user_id, stale_cutoff],
        )?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO sync_locks (user_id, acquired_at) VALUES (?1, ?2)",
            params![user_id, Utc::now().to_rfc3339()],
        )?;
        if inserted == 0 {
            return Err(JobdeckError::SyncInProgress(user_id.to_string()));
        }
        Ok(())
    }

    pub fn release_sync_lock(&self, user_id: &str) -> JobdeckResult<()> {
        self.conn.execute(
            "DELETE FROM sync_locks WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }
}

fn parse_timestamp(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_timestamp(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_timestamp(idx, v)).transpose()
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<CalendarEvent> {
    let category_str: String = row.get(4)?;
    let category = EventCategory::from_str(&category_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown category '{category_str}'").into(),
        )
    })?;

    Ok(CalendarEvent {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        category,
        category_inferred: row.get(5)?,
        start: parse_timestamp(6, row.get(6)?)?,
        end: parse_optional_timestamp(7, row.get(7)?)?,
        location: row.get(8)?,
        meeting_url: row.get(9)?,
        company: row.get(10)?,
        contact_name: row.get(11)?,
        contact_email: row.get(12)?,
        reminder_minutes: row.get(13)?,
        completed: row.get(14)?,
        notes: row.get(15)?,
        created_at: parse_timestamp(16, row.get(16)?)?,
        updated_at: parse_timestamp(17, row.get(17)?)?,
    })
}

fn row_to_ledger_entry(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let direction_str: String = row.get(3)?;
    let direction = SyncDirection::from_str(&direction_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown sync direction '{direction_str}'").into(),
        )
    })?;

    Ok(LedgerEntry {
        user_id: row.get(0)?,
        event_id: row.get(1)?,
        external_event_id: row.get(2)?,
        direction,
        last_synced_at: parse_timestamp(4, row.get(4)?)?,
    })
}

fn row_to_credentials(row: &Row<'_>) -> rusqlite::Result<CredentialRecord> {
    Ok(CredentialRecord {
        user_id: row.get(0)?,
        access_token: row.get(1)?,
        refresh_token: row.get(2)?,
        token_expiry: parse_timestamp(3, row.get(3)?)?,
        sync_enabled: row.get(4)?,
        calendar_id: row.get(5)?,
        last_sync_at: parse_optional_timestamp(6, row.get(6)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event(user_id: &str, title: &str) -> CalendarEvent {
        CalendarEvent::new(
            user_id,
            title,
            EventCategory::Interview,
            Utc.with_ymd_and_hms(2026, 9, 1, 14, 0, 0).unwrap(),
        )
    }

    fn sample_credentials(user_id: &str) -> CredentialRecord {
        CredentialRecord {
            user_id: user_id.to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_expiry: Utc::now() + Duration::hours(1),
            sync_enabled: true,
            calendar_id: "primary".to_string(),
            last_sync_at: None,
        }
    }

    #[test]
    fn event_crud_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let mut event = sample_event("alice", "Interview with Acme");
        event.company = Some("Acme".to_string());
        store.insert_event(&event).unwrap();

        let loaded = store.get_event("alice", &event.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Interview with Acme");
        assert_eq!(loaded.company.as_deref(), Some("Acme"));
        assert_eq!(loaded.start, event.start);

        event.title = "Interview with Acme (rescheduled)".to_string();
        store.update_event(&event).unwrap();
        let loaded = store.get_event("alice", &event.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Interview with Acme (rescheduled)");

        store.delete_event("alice", &event.id).unwrap();
        assert!(store.get_event("alice", &event.id).unwrap().is_none());
    }

    #[test]
    fn events_are_scoped_by_user() {
        let store = Store::open_in_memory().unwrap();
        store.insert_event(&sample_event("alice", "A")).unwrap();
        store.insert_event(&sample_event("bob", "B")).unwrap();

        let alice = store.list_events("alice").unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].title, "A");
    }

    #[test]
    fn deleting_event_deletes_ledger_row() {
        let store = Store::open_in_memory().unwrap();
        let event = sample_event("alice", "Synced");
        store.insert_event(&event).unwrap();
        store
            .upsert_ledger(&LedgerEntry {
                user_id: "alice".to_string(),
                event_id: event.id.clone(),
                external_event_id: "ext-1".to_string(),
                direction: SyncDirection::ToExternal,
                last_synced_at: Utc::now(),
            })
            .unwrap();

        store.delete_event("alice", &event.id).unwrap();
        assert!(store.ledger_for_event("alice", &event.id).unwrap().is_none());
        assert!(store.ledger_for_external("alice", "ext-1").unwrap().is_none());
    }

    #[test]
    fn ledger_upsert_keeps_one_row_per_event() {
        let store = Store::open_in_memory().unwrap();
        let entry = LedgerEntry {
            user_id: "alice".to_string(),
            event_id: "ev-1".to_string(),
            external_event_id: "ext-1".to_string(),
            direction: SyncDirection::ToExternal,
            last_synced_at: Utc::now(),
        };
        store.upsert_ledger(&entry).unwrap();
        store
            .upsert_ledger(&LedgerEntry {
                external_event_id: "ext-2".to_string(),
                ..entry.clone()
            })
            .unwrap();

        assert_eq!(store.count_ledger("alice").unwrap(), 1);
        let loaded = store.ledger_for_event("alice", "ev-1").unwrap().unwrap();
        assert_eq!(loaded.external_event_id, "ext-2");
    }

    #[test]
    fn disconnect_bulk_delete() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_credentials(&sample_credentials("alice")).unwrap();
        for i in 0..3 {
            store
                .upsert_ledger(&LedgerEntry {
                    user_id: "alice".to_string(),
                    event_id: format!("ev-{i}"),
                    external_event_id: format!("ext-{i}"),
                    direction: SyncDirection::FromExternal,
                    last_synced_at: Utc::now(),
                })
                .unwrap();
        }

        store.delete_ledger_for_user("alice").unwrap();
        store.delete_credentials("alice").unwrap();

        assert_eq!(store.count_ledger("alice").unwrap(), 0);
        assert!(store.credentials("alice").unwrap().is_none());
    }

    #[test]
    fn credentials_roundtrip_and_toggle() {
        let store = Store::open_in_memory().unwrap();
        let record = sample_credentials("alice");
        store.upsert_credentials(&record).unwrap();

        let loaded = store.credentials("alice").unwrap().unwrap();
        assert_eq!(loaded.refresh_token, "refresh");
        assert!(loaded.sync_enabled);

        store.set_sync_enabled("alice", false).unwrap();
        assert!(!store.credentials("alice").unwrap().unwrap().sync_enabled);

        assert!(matches!(
            store.set_sync_enabled("bob", true),
            Err(JobdeckError::NotConnected(_))
        ));
    }

    #[test]
    fn sync_lock_blocks_second_acquire() {
        let store = Store::open_in_memory().unwrap();
        store.try_acquire_sync_lock("alice").unwrap();
        assert!(matches!(
            store.try_acquire_sync_lock("alice"),
            Err(JobdeckError::SyncInProgress(_))
        ));

        // Other users are unaffected
        store.try_acquire_sync_lock("bob").unwrap();

        store.release_sync_lock("alice").unwrap();
        store.try_acquire_sync_lock("alice").unwrap();
    }

    #[test]
    fn stale_sync_lock_is_stolen() {
        let store = Store::open_in_memory().unwrap();
        let stale = (Utc::now() - Duration::minutes(STALE_LOCK_MINUTES + 5)).to_rfc3339();
        store
            .conn
            .execute(
                "INSERT INTO sync_locks (user_id, acquired_at) VALUES ('alice', ?1)",
                params![stale],
            )
            .unwrap();

        store.try_acquire_sync_lock("alice").unwrap();
    }

    #[test]
    fn mark_completed_updates_flag() {
        let store = Store::open_in_memory().unwrap();
        let event = sample_event("alice", "Follow up");
        store.insert_event(&event).unwrap();

        store.mark_completed("alice", &event.id, true).unwrap();
        assert!(store.get_event("alice", &event.id).unwrap().unwrap().completed);

        assert!(matches!(
            store.mark_completed("alice", "missing", true),
            Err(JobdeckError::EventNotFound(_))
        ));
    }
}
