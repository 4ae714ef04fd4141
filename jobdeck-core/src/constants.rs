//! Shared constants.

/// How far into the future pull looks for external events, in days.
pub const PULL_WINDOW_DAYS: i64 = 365;

/// Reminder lead time assumed for events that arrive without one.
pub const DEFAULT_REMINDER_MINUTES: i64 = 60;

/// Duration in minutes assumed for events without an explicit end.
pub const DEFAULT_EVENT_MINUTES: i64 = 60;

/// Google's alias for the account's main calendar.
pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// Sync locks older than this are treated as left behind by a dead process.
pub const STALE_LOCK_MINUTES: i64 = 10;
