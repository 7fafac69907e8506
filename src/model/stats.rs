use serde::Serialize;

use super::matches::Match;
use super::member::Position;

/// Aggregated counters for one roster member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberStats {
    pub name: String,
    pub id: i64,
    pub position: Position,
    pub join_date: String,
    pub active: bool,
    pub matches: u32,
    pub goals: u32,
    pub assists: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl MemberStats {
    /// Percentage of played matches that were won, rounded to the nearest
    /// integer. `None` for a member without matches.
    pub fn win_rate(&self) -> Option<u32> {
        percentage(self.wins, self.matches)
    }
}

/// Win/draw/loss record and goal tallies over a set of matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

/// Club-wide overview shown on the statistics view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub total_matches: usize,
    pub record: RecordSummary,
    /// Sum of all goal entries, which can differ from `record.goals_for`
    /// when not every scorer was recorded.
    pub total_goals: u32,
    pub total_assists: u32,
    pub win_rate: u32,
    pub average_goals_for: f64,
    pub average_goals_against: f64,
    pub average_participants: f64,
    pub recent: Vec<Match>,
}

pub(crate) fn percentage(part: u32, total: u32) -> Option<u32> {
    (total > 0).then(|| ((f64::from(part) / f64::from(total)) * 100.0).round() as u32)
}
