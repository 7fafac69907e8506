use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::client::SheetsApi;
use crate::config::SheetLayout;
use crate::error::{Result, SheetsError};
use crate::model::{AuthStatus, ConnectionState, Match, Member, SyncSnapshot};
use crate::sheets::rows::{
    ensure_unique_ids, find_duplicate_ids, header_row, match_to_row, matches_from_rows,
    member_to_row, members_from_rows, MATCH_HEADER, MEMBER_HEADER,
};

/// Receives every snapshot pulled from the spreadsheet.
pub type DataUpdateHandler = Arc<dyn Fn(SyncSnapshot) + Send + Sync>;

/// Receives a user-facing message for every failure the manager reports.
pub type ErrorHandler = Arc<dyn Fn(String) + Send + Sync>;

/// Stops the periodic sync task it was returned for.
#[derive(Debug, Clone)]
pub struct AutoSyncHandle {
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
}

impl AutoSyncHandle {
    fn new() -> Self {
        Self {
            shutdown: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    /// `false` once stopped, or after the task ended on its own because the
    /// credential expired.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

struct Inner {
    sheets: Arc<dyn SheetsApi>,
    layout: SheetLayout,
    on_data_update: DataUpdateHandler,
    on_error: ErrorHandler,
    state: Mutex<ConnectionState>,
    auto_sync: Mutex<Option<AutoSyncHandle>>,
}

/// Keeps the local data in step with the spreadsheet.
///
/// Cloning is cheap and every clone drives the same connection.
#[derive(Clone)]
pub struct DataManager {
    inner: Arc<Inner>,
}

impl DataManager {
    pub fn new(
        sheets: Arc<dyn SheetsApi>,
        layout: SheetLayout,
        on_data_update: DataUpdateHandler,
        on_error: ErrorHandler,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                sheets,
                layout,
                on_data_update,
                on_error,
                state: Mutex::new(ConnectionState::Disconnected),
                auto_sync: Mutex::new(None),
            }),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *current != state {
            debug!(from = %*current, to = %state, "connection state changed");
            *current = state;
        }
    }

    fn report(&self, message: String) {
        (self.inner.on_error)(message);
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.sheets.is_connected().await
    }

    pub async fn auth_status(&self) -> AuthStatus {
        self.inner.sheets.auth_status().await
    }

    /// Initialize the client and authenticate. Failures are reported through
    /// the error handler and turn into `false`.
    pub async fn initialize(&self) -> bool {
        self.set_state(ConnectionState::Authenticating);
        let result = async {
            self.inner.sheets.initialize().await?;
            self.inner.sheets.authenticate().await
        }
        .await;

        match result {
            Ok(()) => {
                self.set_state(ConnectionState::Connected);
                info!("data manager connected");
                true
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                error!(error = %e, "data manager initialization failed");
                self.report(e.to_string());
                false
            }
        }
    }

    /// First pull after connecting. Errors are reported, not returned.
    pub async fn perform_initial_sync(&self) -> Option<SyncSnapshot> {
        if !self.is_connected().await {
            self.report(format!("initial sync failed: {}", SheetsError::NotConnected));
            return None;
        }

        match self.sync_from_sheets().await {
            Ok(snapshot) => {
                info!(
                    matches = snapshot.matches.len(),
                    members = snapshot.members.len(),
                    "initial sync completed"
                );
                Some(snapshot)
            }
            Err(e) => {
                self.report(format!("initial sync failed: {e}"));
                None
            }
        }
    }

    /// Pull both tables and hand the result to the data handler.
    pub async fn sync_from_sheets(&self) -> Result<SyncSnapshot> {
        self.set_state(ConnectionState::Syncing);
        let result = self.pull().await;
        let state = if self.is_connected().await {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        self.set_state(state);

        match result {
            Ok(snapshot) => {
                (self.inner.on_data_update)(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                error!(error = %e, "sync from sheets failed");
                self.report(format!("failed to load data: {e}"));
                Err(e)
            }
        }
    }

    async fn pull(&self) -> Result<SyncSnapshot> {
        let layout = &self.inner.layout;
        let matches_range = layout.matches_read_range();
        let members_range = layout.members_read_range();
        let (match_rows, member_rows) = tokio::try_join!(
            self.inner.sheets.read_range(&matches_range),
            self.inner.sheets.read_range(&members_range),
        )?;

        let now = Utc::now().timestamp_millis();
        let matches = matches_from_rows(&match_rows, now);
        let members = members_from_rows(&member_rows, now);

        let duplicate_matches = find_duplicate_ids(matches.iter().map(|m| m.id));
        if !duplicate_matches.is_empty() {
            warn!(ids = ?duplicate_matches, "duplicate match ids found");
        }
        let duplicate_members = find_duplicate_ids(members.iter().map(|m| m.id));
        if !duplicate_members.is_empty() {
            warn!(ids = ?duplicate_members, "duplicate member ids found");
        }

        Ok(SyncSnapshot { matches, members })
    }

    /// Report a failed write. An expired credential also drops the
    /// connection state so the caller knows to reconnect.
    fn write_failed(&self, context: &str, e: SheetsError) -> SheetsError {
        if e.is_token_expired() {
            self.set_state(ConnectionState::Disconnected);
        }
        self.report(format!("{context}: {e}"));
        e
    }

    /// Overwrite the matches tab with `matches`, header included. Returns the
    /// records as written, with colliding ids replaced.
    pub async fn sync_matches(&self, matches: &[Match]) -> Result<Vec<Match>> {
        let now = Utc::now();
        let unique = ensure_unique_ids(matches.to_vec(), now.timestamp_millis());
        let updated_at = now.to_rfc3339();
        let rows = std::iter::once(header_row(&MATCH_HEADER))
            .chain(unique.iter().map(|m| match_to_row(m, &updated_at)))
            .collect();

        match self
            .inner
            .sheets
            .write_range(&self.inner.layout.matches_write_range(), rows)
            .await
        {
            Ok(()) => {
                info!(count = unique.len(), "matches written to sheet");
                Ok(unique)
            }
            Err(e) => Err(self.write_failed("failed to sync matches", e)),
        }
    }

    /// Overwrite the members tab with `members`, header included. Returns the
    /// records as written, with colliding ids replaced.
    pub async fn sync_members(&self, members: &[Member]) -> Result<Vec<Member>> {
        let now = Utc::now();
        let unique = ensure_unique_ids(members.to_vec(), now.timestamp_millis());
        let updated_at = now.to_rfc3339();
        let rows = std::iter::once(header_row(&MEMBER_HEADER))
            .chain(unique.iter().map(|m| member_to_row(m, &updated_at)))
            .collect();

        match self
            .inner
            .sheets
            .write_range(&self.inner.layout.members_write_range(), rows)
            .await
        {
            Ok(()) => {
                info!(count = unique.len(), "members written to sheet");
                Ok(unique)
            }
            Err(e) => Err(self.write_failed("failed to sync members", e)),
        }
    }

    pub async fn add_match(&self, m: &Match) -> Result<()> {
        let row = match_to_row(m, &Utc::now().to_rfc3339());
        let range = self.inner.layout.matches_append_range();
        match self.inner.sheets.append_rows(&range, vec![row]).await {
            Ok(()) => {
                info!(id = m.id, "match appended to sheet");
                Ok(())
            }
            Err(e) => Err(self.write_failed("failed to add match", e)),
        }
    }

    pub async fn add_member(&self, member: &Member) -> Result<()> {
        let row = member_to_row(member, &Utc::now().to_rfc3339());
        let range = self.inner.layout.members_append_range();
        match self.inner.sheets.append_rows(&range, vec![row]).await {
            Ok(()) => {
                info!(id = member.id, "member appended to sheet");
                Ok(())
            }
            Err(e) => Err(self.write_failed("failed to add member", e)),
        }
    }

    /// Pull every `period`, replacing any task started before. The first pull
    /// happens one period from now.
    pub fn start_auto_sync(&self, period: Duration) -> AutoSyncHandle {
        let handle = AutoSyncHandle::new();
        let previous = self
            .inner
            .auto_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle.clone());
        if let Some(previous) = previous {
            previous.stop();
        }

        let manager = self.clone();
        let task_handle = handle.clone();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = task_handle.shutdown.notified() => break,
                    _ = ticker.tick() => {
                        if !task_handle.is_running() || !manager.auto_sync_tick().await {
                            break;
                        }
                    }
                }
            }
            task_handle.running.store(false, Ordering::SeqCst);
            debug!("auto sync task finished");
        });

        info!(period_secs = period.as_secs_f64(), "auto sync started");
        handle
    }

    pub fn stop_auto_sync(&self) {
        let handle = self
            .inner
            .auto_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop();
            info!("auto sync stopped");
        }
    }

    pub fn is_auto_syncing(&self) -> bool {
        self.inner
            .auto_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(AutoSyncHandle::is_running)
    }

    /// One timer tick. Returns `false` when the task should end.
    async fn auto_sync_tick(&self) -> bool {
        if !self.is_connected().await {
            warn!("auto sync skipped, not connected");
            return true;
        }

        match self.sync_from_sheets().await {
            Ok(_) => {
                debug!("auto sync completed");
                true
            }
            Err(e) if e.is_token_expired() => {
                self.set_state(ConnectionState::Disconnected);
                self.report("access token expired, please reconnect".to_string());
                false
            }
            Err(e) => {
                warn!(error = %e, "auto sync failed, retrying on next tick");
                true
            }
        }
    }

    /// Stop syncing and revoke the credential.
    pub async fn disconnect(&self) {
        self.stop_auto_sync();
        self.inner.sheets.sign_out().await;
        self.set_state(ConnectionState::Disconnected);
        info!("disconnected from sheets");
    }
}
