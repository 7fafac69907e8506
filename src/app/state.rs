use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::form::{MatchDraft, MemberDraft};
use super::notification::{NotificationKind, NotificationQueue};
use super::view::{self, MatchFilters, MatchListView, RegistrationView, RosterView, StatsView};
use crate::model::{Match, Member, Position, SyncSnapshot, SyncStatus};
use crate::permission::{Capability, Session};

/// The four views of the app.
#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Tab {
    #[default]
    Registration,
    Matches,
    Members,
    Stats,
}

impl Tab {
    /// Capability needed to open the tab, if any.
    pub fn required_capability(self) -> Option<Capability> {
        match self {
            Tab::Registration | Tab::Members => None,
            Tab::Matches => Some(Capability::ViewMatches),
            Tab::Stats => Some(Capability::ViewStats),
        }
    }
}

/// Everything a user can do, plus the events the sync layer feeds in.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SelectTab(Tab),

    SetMatchDate(String),
    SetSeason(String),
    SetOpponent(String),
    SetHomeScore(Option<u32>),
    SetAwayScore(Option<u32>),
    AddParticipant(String),
    RemoveParticipant(String),
    AddGoal { player: String, count: u32 },
    RemoveGoal(String),
    AddAssist { player: String, count: u32 },
    RemoveAssist(String),
    SubmitMatch,

    SetMemberName(String),
    SetMemberPosition(Position),
    SetMemberJoinDate(String),
    AddMember,
    ToggleMemberActive(i64),
    DeleteMember(i64),

    SetYearFilter(Option<i32>),
    SetSeasonFilter(Option<String>),

    DataSynced(SyncSnapshot),
    SetAuthenticated(bool),
    SetOnline(bool),
    Notify { kind: NotificationKind, message: String },
}

/// A record that should also reach the spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteWrite {
    AddMatch(Match),
    AddMember(Member),
}

/// All mutable state of the app. Changed only through [`AppState::apply`].
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub current_tab: Tab,
    /// Newest first.
    pub matches: Vec<Match>,
    pub members: Vec<Member>,
    pub match_draft: MatchDraft,
    pub member_draft: MemberDraft,
    pub filters: MatchFilters,
    pub notifications: NotificationQueue,
    pub sync_status: SyncStatus,
    pub session: Session,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>, now: DateTime<Utc>) {
        self.notifications.push(kind, message, now);
    }

    /// Check a capability, leaving a notification when it is missing.
    fn permit(&mut self, capability: Capability, now: DateTime<Utc>) -> bool {
        if self.session.has_permission(capability) {
            return true;
        }
        debug!(role = %self.session.role(), %capability, "action not permitted");
        self.notify(
            NotificationKind::Error,
            format!("the {} role is not allowed to do this", self.session.role()),
            now,
        );
        false
    }

    /// Apply one action. Returns the write the caller should push to the
    /// spreadsheet, which only happens while authenticated.
    pub fn apply(&mut self, action: Action, now: DateTime<Utc>) -> Option<RemoteWrite> {
        self.notifications.prune(now);

        match action {
            Action::SelectTab(tab) => {
                if tab
                    .required_capability()
                    .is_none_or(|capability| self.permit(capability, now))
                {
                    self.current_tab = tab;
                }
            }

            Action::SetMatchDate(date) => self.match_draft.date = date,
            Action::SetSeason(season) => self.match_draft.season = season,
            Action::SetOpponent(opponent) => self.match_draft.opponent = opponent,
            Action::SetHomeScore(score) => self.match_draft.home_score = score,
            Action::SetAwayScore(score) => self.match_draft.away_score = score,
            Action::AddParticipant(name) => {
                self.match_draft.add_participant(&name);
            }
            Action::RemoveParticipant(name) => self.match_draft.remove_participant(&name),
            Action::AddGoal { player, count } => {
                self.match_draft.add_goal(&player, count);
            }
            Action::RemoveGoal(player) => self.match_draft.remove_goal(&player),
            Action::AddAssist { player, count } => {
                self.match_draft.add_assist(&player, count);
            }
            Action::RemoveAssist(player) => self.match_draft.remove_assist(&player),
            Action::SubmitMatch => return self.submit_match(now),

            Action::SetMemberName(name) => self.member_draft.name = name,
            Action::SetMemberPosition(position) => self.member_draft.position = position,
            Action::SetMemberJoinDate(date) => self.member_draft.join_date = date,
            Action::AddMember => return self.add_member(now),
            Action::ToggleMemberActive(id) => {
                if self.permit(Capability::ManageMembers, now) {
                    if let Some(member) = self.members.iter_mut().find(|m| m.id == id) {
                        member.active = !member.active;
                    }
                }
            }
            Action::DeleteMember(id) => self.delete_member(id, now),

            Action::SetYearFilter(year) => self.filters.year = year,
            Action::SetSeasonFilter(season) => {
                self.filters.season = season.filter(|s| !s.is_empty());
            }

            Action::DataSynced(snapshot) => {
                self.matches = snapshot.matches;
                self.members = snapshot.members;
                self.sync_status.last_sync = Some(now);
            }
            Action::SetAuthenticated(authenticated) => {
                self.sync_status.authenticated = authenticated;
            }
            Action::SetOnline(online) => {
                self.sync_status.online = online;
                if online {
                    self.notify(NotificationKind::Info, "back online", now);
                } else {
                    self.notify(NotificationKind::Warning, "working offline", now);
                }
            }
            Action::Notify { kind, message } => self.notify(kind, message, now),
        }
        None
    }

    fn submit_match(&mut self, now: DateTime<Utc>) -> Option<RemoteWrite> {
        if !self.permit(Capability::RegisterMatch, now) {
            return None;
        }
        let Some(m) = self.match_draft.to_match(now.timestamp_millis()) else {
            self.notify(
                NotificationKind::Warning,
                "date, opponent and both scores are required",
                now,
            );
            return None;
        };

        self.matches.insert(0, m.clone());
        self.match_draft = MatchDraft::default();
        if self.sync_status.authenticated {
            Some(RemoteWrite::AddMatch(m))
        } else {
            self.notify(NotificationKind::Success, "match saved locally", now);
            None
        }
    }

    fn add_member(&mut self, now: DateTime<Utc>) -> Option<RemoteWrite> {
        if !self.permit(Capability::ManageMembers, now) {
            return None;
        }
        let Some(member) = self.member_draft.to_member(now.timestamp_millis()) else {
            self.notify(
                NotificationKind::Warning,
                "name and join date are required",
                now,
            );
            return None;
        };
        if self.members.iter().any(|m| m.name == member.name) {
            self.notify(
                NotificationKind::Error,
                format!("a member named {} already exists", member.name),
                now,
            );
            return None;
        }

        self.members.push(member.clone());
        self.member_draft = MemberDraft::default();
        if self.sync_status.authenticated {
            Some(RemoteWrite::AddMember(member))
        } else {
            self.notify(NotificationKind::Success, "member saved locally", now);
            None
        }
    }

    /// Removal is local. The row stays in the sheet and comes back on the
    /// next pull.
    fn delete_member(&mut self, id: i64, now: DateTime<Utc>) {
        if !self.permit(Capability::ManageMembers, now) {
            return;
        }
        let before = self.members.len();
        self.members.retain(|m| m.id != id);
        if self.members.len() != before && self.sync_status.authenticated {
            self.notify(
                NotificationKind::Info,
                "member removed locally, the sheet is unchanged",
                now,
            );
        }
    }

    /// Turn the outcome of a remote write into a notification. The local
    /// change stays either way.
    pub fn complete_remote_write(&mut self, write: &RemoteWrite, ok: bool, now: DateTime<Utc>) {
        let (kind, message) = match (write, ok) {
            (RemoteWrite::AddMatch(_), true) => {
                (NotificationKind::Success, "match saved and synced")
            }
            (RemoteWrite::AddMatch(_), false) => {
                (NotificationKind::Warning, "match saved, but syncing it failed")
            }
            (RemoteWrite::AddMember(_), true) => {
                (NotificationKind::Success, "member added and synced")
            }
            (RemoteWrite::AddMember(_), false) => {
                (NotificationKind::Warning, "member added, but syncing it failed")
            }
        };
        self.notify(kind, message, now);
    }

    pub fn registration_view(&self) -> RegistrationView<'_> {
        view::registration(&self.members, &self.match_draft.participants)
    }

    pub fn match_list_view(&self) -> MatchListView<'_> {
        view::match_list(&self.matches, &self.filters)
    }

    pub fn roster_view(&self) -> RosterView<'_> {
        view::roster(&self.members, self.session.role())
    }

    pub fn stats_view(&self) -> StatsView {
        view::statistics(&self.members, &self.matches)
    }
}
