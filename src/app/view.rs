//! Read-only projections of [`AppState`](super::AppState), one per tab.

use itertools::Itertools;
use serde::Serialize;

use crate::model::{Match, Member, MemberStats, RecordSummary, TeamSummary};
use crate::permission::Role;
use crate::stats::{self, RANKING_SIZE};

/// Match list filters. `None` means no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchFilters {
    pub year: Option<i32>,
    pub season: Option<String>,
}

impl MatchFilters {
    /// A match with an unreadable date never passes a year filter.
    pub fn accepts(&self, m: &Match) -> bool {
        if let Some(year) = self.year {
            if m.year() != Some(year) {
                return false;
            }
        }
        match &self.season {
            Some(season) => &m.season == season,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationView<'a> {
    /// Active members not yet on the participant list.
    pub eligible_participants: Vec<&'a str>,
    /// Participants, for the scorer and assister pickers.
    pub selected_participants: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchListView<'a> {
    pub matches: Vec<&'a Match>,
    pub record: RecordSummary,
    pub available_years: Vec<i32>,
    pub seasons: Vec<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterView<'a> {
    pub members: &'a [Member],
    pub active_count: usize,
    /// Role of the person looking at the roster and what it allows.
    pub viewer_role: Role,
    pub viewer_role_description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    /// Every member, most matches played first.
    pub rows: Vec<MemberStats>,
    pub top_scorers: Vec<MemberStats>,
    pub top_assisters: Vec<MemberStats>,
    pub summary: TeamSummary,
}

pub(crate) fn registration<'a>(
    members: &'a [Member],
    participants: &'a [String],
) -> RegistrationView<'a> {
    RegistrationView {
        eligible_participants: members
            .iter()
            .filter(|m| m.active && !participants.contains(&m.name))
            .map(|m| m.name.as_str())
            .collect_vec(),
        selected_participants: participants,
    }
}

pub(crate) fn match_list<'a>(matches: &'a [Match], filters: &MatchFilters) -> MatchListView<'a> {
    let filtered = matches.iter().filter(|m| filters.accepts(m)).collect_vec();
    MatchListView {
        record: RecordSummary::from_matches(filtered.iter().copied()),
        matches: filtered,
        available_years: stats::available_years(matches),
        seasons: matches
            .iter()
            .map(|m| m.season.as_str())
            .filter(|s| !s.is_empty())
            .unique()
            .collect_vec(),
    }
}

pub(crate) fn roster(members: &[Member], viewer_role: Role) -> RosterView<'_> {
    RosterView {
        members,
        active_count: members.iter().filter(|m| m.active).count(),
        viewer_role,
        viewer_role_description: viewer_role.description(),
    }
}

pub(crate) fn statistics(members: &[Member], matches: &[Match]) -> StatsView {
    let table = stats::member_stats(members, matches);
    StatsView {
        rows: stats::by_matches_played(&table).into_iter().cloned().collect(),
        top_scorers: stats::top_scorers(&table, RANKING_SIZE)
            .into_iter()
            .cloned()
            .collect(),
        top_assisters: stats::top_assisters(&table, RANKING_SIZE)
            .into_iter()
            .cloned()
            .collect(),
        summary: TeamSummary::from_matches(matches),
    }
}
