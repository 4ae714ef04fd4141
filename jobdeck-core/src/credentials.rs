//! Stored OAuth credentials for one user's external calendar account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user's Google Calendar connection.
///
/// Created on a successful authorization-code exchange, updated on every
/// token refresh, deleted on disconnect. The access token in a freshly
/// loaded record may be expired; use `oauth::valid_credentials` to get a
/// record whose token is usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expiry: DateTime<Utc>,
    pub sync_enabled: bool,
    /// Target calendar, defaults to the account's primary calendar.
    pub calendar_id: String,
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    pub fn is_expired(&self) -> bool {
        self.token_expiry <= Utc::now()
    }
}
