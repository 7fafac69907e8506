use chrono::{DateTime, Utc};
use serde::Serialize;

use super::matches::Match;
use super::member::Member;

/// Everything pulled from the spreadsheet in one sync. Local state is
/// replaced by a snapshot as a whole, never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncSnapshot {
    pub matches: Vec<Match>,
    pub members: Vec<Member>,
}

/// Session-wide synchronization flags shown in the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub authenticated: bool,
    pub online: bool,
    pub last_sync: Option<DateTime<Utc>>,
    /// Always zero, every change is pushed immediately.
    pub pending_changes: u32,
    pub syncing: bool,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            authenticated: false,
            online: true,
            last_sync: None,
            pending_changes: 0,
            syncing: false,
        }
    }
}

/// Connection lifecycle of the data manager.
#[derive(
    Default, Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, strum_macros::Display,
)]
#[strum(serialize_all = "kebab-case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Authenticating,
    Connected,
    Syncing,
}

/// Credential state as reported by the spreadsheet client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub initialized: bool,
    pub authenticated: bool,
    pub has_token: bool,
}
