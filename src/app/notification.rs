use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// Notifications kept on screen at once.
pub const MAX_NOTIFICATIONS: usize = 5;

/// How long a notification stays visible.
pub const NOTIFICATION_TTL_SECS: i64 = 5;

#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + TimeDelta::seconds(NOTIFICATION_TTL_SECS)
    }
}

/// Transient messages, newest first.
#[derive(Debug, Clone, Default)]
pub struct NotificationQueue {
    entries: VecDeque<Notification>,
    next_id: u64,
}

impl NotificationQueue {
    /// Add a message in front, dropping the oldest beyond the limit.
    pub fn push(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> u64 {
        self.next_id += 1;
        self.entries.push_front(Notification {
            id: self.next_id,
            kind,
            message: message.into(),
            created_at: now,
        });
        self.entries.truncate(MAX_NOTIFICATIONS);
        self.next_id
    }

    /// Drop every entry that has expired at `now`.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.entries.retain(|n| n.expires_at() > now);
    }

    /// Entries still live at `now`, whether or not `prune` has run.
    pub fn visible(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Notification> {
        self.entries.iter().filter(move |n| n.expires_at() > now)
    }

    pub fn dismiss(&mut self, id: u64) {
        self.entries.retain(|n| n.id != id);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
