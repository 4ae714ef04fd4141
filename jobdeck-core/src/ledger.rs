//! Sync ledger types.
//!
//! The ledger maps local event ids to external event ids. A pair in the
//! ledger is the proof an event has already been synced; it is what keeps
//! repeated pushes from duplicating events remotely and repeated pulls from
//! re-importing them locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which direction a ledger pairing was first established in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    ToExternal,
    FromExternal,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::ToExternal => "to_external",
            SyncDirection::FromExternal => "from_external",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "to_external" => Some(SyncDirection::ToExternal),
            "from_external" => Some(SyncDirection::FromExternal),
            _ => None,
        }
    }
}

/// One local-id ↔ external-id pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub user_id: String,
    pub event_id: String,
    pub external_event_id: String,
    pub direction: SyncDirection,
    pub last_synced_at: DateTime<Utc>,
}
