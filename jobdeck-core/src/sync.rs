//! Push/pull synchronization between the local store and the external
//! calendar.
//!
//! Each operation is a one-shot, sequential batch guarded by the per-user
//! advisory lock. Per-event failures are counted and skipped; only token
//! acquisition, lock contention and the initial remote list call fail the
//! whole operation. Bidirectional sync is push-then-pull with no merge:
//! the local copy wins because pull never revisits pairs already in the
//! ledger.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::PULL_WINDOW_DAYS;
use crate::error::{JobdeckError, JobdeckResult};
use crate::event::CalendarEvent;
use crate::google::convert::{from_google_event, to_google_event};
use crate::google::{CalendarApi, GoogleEvent};
use crate::ledger::{LedgerEntry, SyncDirection};
use crate::store::Store;

/// Outcome of a push batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushReport {
    pub created: u32,
    pub updated: u32,
    pub errors: u32,
}

/// Outcome of a pull batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullReport {
    pub imported: u32,
    pub skipped: u32,
    pub errors: u32,
}

/// Outcome of a bidirectional sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub to_google: PushReport,
    pub from_google: PullReport,
}

/// Holds the per-user advisory lock for the duration of one operation.
struct SyncLock<'a> {
    store: &'a Store,
    user_id: &'a str,
}

impl<'a> SyncLock<'a> {
    fn acquire(store: &'a Store, user_id: &'a str) -> JobdeckResult<Self> {
        store.try_acquire_sync_lock(user_id)?;
        Ok(SyncLock { store, user_id })
    }
}

impl Drop for SyncLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.store.release_sync_lock(self.user_id) {
            warn!(user = self.user_id, error = %e, "failed to release sync lock");
        }
    }
}

enum Pushed {
    Created,
    Updated,
}

/// One-shot sync operations for a single user against one calendar.
pub struct SyncEngine<'a, A> {
    store: &'a Store,
    api: &'a A,
    user_id: &'a str,
    calendar_id: &'a str,
}

impl<'a, A: CalendarApi> SyncEngine<'a, A> {
    pub fn new(store: &'a Store, api: &'a A, user_id: &'a str, calendar_id: &'a str) -> Self {
        SyncEngine {
            store,
            api,
            user_id,
            calendar_id,
        }
    }

    /// Push every local event to the external calendar.
    pub async fn push(&self) -> JobdeckResult<PushReport> {
        let _lock = SyncLock::acquire(self.store, self.user_id)?;
        let report = self.push_batch().await?;
        self.store.set_last_sync(self.user_id, Utc::now())?;
        Ok(report)
    }

    /// Import external events not yet known to the ledger.
    pub async fn pull(&self) -> JobdeckResult<PullReport> {
        let _lock = SyncLock::acquire(self.store, self.user_id)?;
        let report = self.pull_batch().await?;
        self.store.set_last_sync(self.user_id, Utc::now())?;
        Ok(report)
    }

    /// Push to completion, then pull.
    pub async fn sync_all(&self) -> JobdeckResult<SyncReport> {
        let _lock = SyncLock::acquire(self.store, self.user_id)?;
        let to_google = self.push_batch().await?;
        let from_google = self.pull_batch().await?;
        self.store.set_last_sync(self.user_id, Utc::now())?;
        Ok(SyncReport {
            to_google,
            from_google,
        })
    }

    /// Push a single event (backs the UI's auto-sync on edit).
    pub async fn push_single(&self, event_id: &str) -> JobdeckResult<PushReport> {
        let _lock = SyncLock::acquire(self.store, self.user_id)?;
        let event = self
            .store
            .get_event(self.user_id, event_id)?
            .ok_or_else(|| JobdeckError::EventNotFound(event_id.to_string()))?;

        let mut report = PushReport::default();
        match self.push_event(&event).await {
            Ok(Pushed::Created) => report.created += 1,
            Ok(Pushed::Updated) => report.updated += 1,
            Err(e) => {
                warn!(user = self.user_id, event = %event.id, error = %e, "failed to push event");
                report.errors += 1;
            }
        }
        self.store.set_last_sync(self.user_id, Utc::now())?;
        Ok(report)
    }

    async fn push_batch(&self) -> JobdeckResult<PushReport> {
        let events = self.store.list_events(self.user_id)?;
        info!(user = self.user_id, count = events.len(), "pushing local events");

        let mut report = PushReport::default();
        for event in &events {
            match self.push_event(event).await {
                Ok(Pushed::Created) => report.created += 1,
                Ok(Pushed::Updated) => report.updated += 1,
                Err(e) => {
                    warn!(user = self.user_id, event = %event.id, error = %e, "failed to push event");
                    report.errors += 1;
                }
            }
        }

        info!(
            user = self.user_id,
            created = report.created,
            updated = report.updated,
            errors = report.errors,
            "push finished"
        );
        Ok(report)
    }

    async fn push_event(&self, event: &CalendarEvent) -> JobdeckResult<Pushed> {
        match self.store.ledger_for_event(self.user_id, &event.id)? {
            None => {
                let created = self
                    .api
                    .insert_event(self.calendar_id, &to_google_event(event))
                    .await?;
                if created.id.is_empty() {
                    return Err(JobdeckError::Provider(
                        "provider returned a created event without an id".to_string(),
                    ));
                }
                self.store.upsert_ledger(&LedgerEntry {
                    user_id: self.user_id.to_string(),
                    event_id: event.id.clone(),
                    external_event_id: created.id,
                    direction: SyncDirection::ToExternal,
                    last_synced_at: Utc::now(),
                })?;
                Ok(Pushed::Created)
            }
            Some(entry) => {
                self.api
                    .patch_event(
                        self.calendar_id,
                        &entry.external_event_id,
                        &to_google_event(event),
                    )
                    .await?;
                self.store.touch_ledger(self.user_id, &event.id)?;
                Ok(Pushed::Updated)
            }
        }
    }

    async fn pull_batch(&self) -> JobdeckResult<PullReport> {
        let now = Utc::now();
        let window_end = now + Duration::days(PULL_WINDOW_DAYS);

        // An outright list failure (bad credentials, malformed window)
        // fails the whole operation; per-event trouble below does not.
        let remote = self
            .api
            .list_events(self.calendar_id, now, window_end)
            .await?;
        info!(user = self.user_id, count = remote.len(), "pulling external events");

        let mut report = PullReport::default();
        for google_event in &remote {
            match self.pull_event(google_event) {
                Ok(true) => report.imported += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    warn!(user = self.user_id, external = %google_event.id, error = %e, "failed to import event");
                    report.errors += 1;
                }
            }
        }

        info!(
            user = self.user_id,
            imported = report.imported,
            skipped = report.skipped,
            errors = report.errors,
            "pull finished"
        );
        Ok(report)
    }

    /// Import one external event. Returns false when the ledger already
    /// maps it (pull never revisits known pairs).
    fn pull_event(&self, google_event: &GoogleEvent) -> JobdeckResult<bool> {
        if self
            .store
            .ledger_for_external(self.user_id, &google_event.id)?
            .is_some()
        {
            return Ok(false);
        }

        let event = from_google_event(self.user_id, google_event)?;
        self.store.insert_event(&event)?;
        self.store.upsert_ledger(&LedgerEntry {
            user_id: self.user_id.to_string(),
            event_id: event.id,
            external_event_id: google_event.id.clone(),
            direction: SyncDirection::FromExternal,
            last_synced_at: Utc::now(),
        })?;
        Ok(true)
    }
}
