use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::notification::{Notification, NotificationKind};
use super::state::{Action, AppState, RemoteWrite};
use crate::client::SheetsApi;
use crate::config::SheetsConfig;
use crate::manager::DataManager;
use crate::model::{ConnectionState, SyncSnapshot};
use crate::permission::Session;

/// What the data manager reports from its callbacks, possibly from the
/// background sync task.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Data(SyncSnapshot),
    Error(String),
}

/// Drives [`AppState`] from user actions and from the data manager.
pub struct ClubApp {
    state: AppState,
    manager: DataManager,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    sync_interval: Duration,
}

impl ClubApp {
    /// Layout and auto-sync period come from `config`.
    pub fn new(sheets: Arc<dyn SheetsApi>, config: &SheetsConfig, session: Session) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let data_tx = tx.clone();
        let manager = DataManager::new(
            sheets,
            config.layout.clone(),
            Arc::new(move |snapshot: SyncSnapshot| {
                let _ = data_tx.send(SyncEvent::Data(snapshot));
            }),
            Arc::new(move |message: String| {
                let _ = tx.send(SyncEvent::Error(message));
            }),
        );

        Self {
            state: AppState::new(session),
            manager,
            events,
            sync_interval: config.sync_interval,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn manager(&self) -> &DataManager {
        &self.manager
    }

    /// Notifications still on screen at `now`.
    pub fn notifications(&self, now: DateTime<Utc>) -> Vec<&Notification> {
        self.state.notifications.visible(now).collect()
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.state.apply(
            Action::Notify {
                kind,
                message: message.into(),
            },
            Utc::now(),
        );
    }

    /// Periodic housekeeping for the front end: drain manager events and drop
    /// expired notifications.
    pub fn tick(&mut self, now: DateTime<Utc>) -> usize {
        let handled = self.process_events();
        self.state.notifications.prune(now);
        handled
    }

    /// Apply everything the manager reported since the last call. Returns the
    /// number of events handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            let action = match event {
                SyncEvent::Data(snapshot) => Action::DataSynced(snapshot),
                SyncEvent::Error(message) => Action::Notify {
                    kind: NotificationKind::Error,
                    message,
                },
            };
            self.state.apply(action, Utc::now());
            handled += 1;
        }
        if handled > 0 {
            debug!(handled, "sync events applied");
        }
        self.check_connection();
        handled
    }

    /// The manager drops to disconnected when the credential expires. From
    /// then on writes stay local until the user connects again.
    fn check_connection(&mut self) {
        if self.state.sync_status.authenticated
            && self.manager.connection_state() == ConnectionState::Disconnected
        {
            warn!("connection lost, reconnect required");
            self.manager.stop_auto_sync();
            self.state.apply(Action::SetAuthenticated(false), Utc::now());
            self.notify(
                NotificationKind::Warning,
                "session expired, connect to Google Sheets again",
            );
        }
    }

    /// Authenticate, pull once and start the periodic sync.
    pub async fn connect(&mut self) -> bool {
        self.notify(NotificationKind::Info, "connecting to Google Sheets");
        self.state.sync_status.syncing = true;
        let connected = self.connect_and_pull().await;
        self.state.sync_status.syncing = false;
        connected
    }

    async fn connect_and_pull(&mut self) -> bool {
        if !self.manager.initialize().await {
            self.process_events();
            return false;
        }

        self.state.apply(Action::SetAuthenticated(true), Utc::now());
        self.notify(NotificationKind::Success, "connected to Google Sheets");

        let synced = self.manager.perform_initial_sync().await.is_some();
        self.process_events();
        if !self.state.sync_status.authenticated {
            return false;
        }
        if synced {
            self.notify(NotificationKind::Success, "data synchronized");
        }

        self.manager.start_auto_sync(self.sync_interval);
        info!(period_secs = self.sync_interval.as_secs(), "club app connected");
        true
    }

    pub async fn manual_sync(&mut self) -> bool {
        if !self.state.sync_status.authenticated {
            self.notify(NotificationKind::Warning, "connect to Google Sheets first");
            return false;
        }

        self.state.sync_status.syncing = true;
        let result = self.manager.sync_from_sheets().await;
        self.state.sync_status.syncing = false;
        self.process_events();

        match result {
            Ok(_) => {
                self.notify(NotificationKind::Success, "data synchronized");
                true
            }
            Err(_) => {
                self.notify(NotificationKind::Error, "synchronization failed");
                false
            }
        }
    }

    /// Apply a user action and push the resulting write, if any.
    pub async fn dispatch(&mut self, action: Action) {
        let Some(write) = self.state.apply(action, Utc::now()) else {
            return;
        };

        let outcome = match &write {
            RemoteWrite::AddMatch(m) => self.manager.add_match(m).await,
            RemoteWrite::AddMember(member) => self.manager.add_member(member).await,
        };
        self.process_events();
        self.state
            .complete_remote_write(&write, outcome.is_ok(), Utc::now());
    }

    /// Connectivity changes only update the flag. The timer keeps running.
    pub fn set_online(&mut self, online: bool) {
        self.state.apply(Action::SetOnline(online), Utc::now());
    }

    pub async fn disconnect(&mut self) {
        self.manager.disconnect().await;
        self.state.apply(Action::SetAuthenticated(false), Utc::now());
        self.process_events();
        self.notify(NotificationKind::Info, "disconnected from Google Sheets");
    }
}
