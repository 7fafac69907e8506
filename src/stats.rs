//! Statistics derived from the match history and roster.
//!
//! Everything here is a pure function of its inputs and is recomputed from
//! scratch whenever the underlying data changes.

use std::collections::HashMap;

use itertools::Itertools;

use crate::model::{
    percentage, Match, MatchResult, Member, MemberStats, PlayerCount, RecordSummary, TeamSummary,
};

/// How many entries the ranking views show.
pub const RANKING_SIZE: usize = 5;

/// How many of the latest matches the team overview lists.
pub const RECENT_MATCHES: usize = 3;

/// Per-member statistics, keyed by member name and kept in roster order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberStatsTable {
    entries: Vec<MemberStats>,
    index: HashMap<String, usize>,
}

impl MemberStatsTable {
    pub fn get(&self, name: &str) -> Option<&MemberStats> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemberStats> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn seed(&mut self, member: &Member) {
        let stats = MemberStats {
            name: member.name.clone(),
            id: member.id,
            position: member.position,
            join_date: member.join_date.clone(),
            active: member.active,
            matches: 0,
            goals: 0,
            assists: 0,
            wins: 0,
            draws: 0,
            losses: 0,
        };
        // A repeated name keeps the first slot but takes the later record.
        match self.index.get(&member.name) {
            Some(&i) => self.entries[i] = stats,
            None => {
                self.index.insert(member.name.clone(), self.entries.len());
                self.entries.push(stats);
            }
        }
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut MemberStats> {
        self.index.get(name).map(|&i| &mut self.entries[i])
    }
}

/// Reduce the match history into per-member counters.
///
/// Players that are not on the roster are ignored.
pub fn member_stats(members: &[Member], matches: &[Match]) -> MemberStatsTable {
    let mut table = MemberStatsTable::default();
    for member in members {
        table.seed(member);
    }

    for m in matches {
        for participant in &m.participants {
            if let Some(stats) = table.get_mut(participant) {
                stats.matches += 1;
                match m.result {
                    MatchResult::Win => stats.wins += 1,
                    MatchResult::Draw => stats.draws += 1,
                    MatchResult::Loss => stats.losses += 1,
                }
            }
        }

        for goal in &m.goals {
            if let Some(stats) = table.get_mut(&goal.player) {
                stats.goals += goal.count;
            }
        }

        for assist in &m.assists {
            if let Some(stats) = table.get_mut(&assist.player) {
                stats.assists += assist.count;
            }
        }
    }

    table
}

/// Members with at least one goal, best scorers first. Ties keep roster order.
pub fn top_scorers(table: &MemberStatsTable, limit: usize) -> Vec<&MemberStats> {
    ranked_by(table, limit, |s| s.goals)
}

/// Members with at least one assist, best assisters first. Ties keep roster order.
pub fn top_assisters(table: &MemberStatsTable, limit: usize) -> Vec<&MemberStats> {
    ranked_by(table, limit, |s| s.assists)
}

/// Every member ordered by matches played, most first.
pub fn by_matches_played(table: &MemberStatsTable) -> Vec<&MemberStats> {
    table
        .iter()
        .sorted_by(|a, b| b.matches.cmp(&a.matches))
        .collect_vec()
}

fn ranked_by(
    table: &MemberStatsTable,
    limit: usize,
    key: impl Fn(&MemberStats) -> u32,
) -> Vec<&MemberStats> {
    table
        .iter()
        .filter(|s| key(s) > 0)
        .sorted_by(|a, b| key(b).cmp(&key(a)))
        .take(limit)
        .collect_vec()
}

/// Distinct years that have matches, newest first.
pub fn available_years(matches: &[Match]) -> Vec<i32> {
    matches
        .iter()
        .filter_map(Match::year)
        .unique()
        .sorted_by(|a, b| b.cmp(a))
        .collect_vec()
}

impl RecordSummary {
    pub fn from_matches<'a>(matches: impl IntoIterator<Item = &'a Match>) -> Self {
        matches
            .into_iter()
            .fold(RecordSummary::default(), |mut summary, m| {
                match m.result {
                    MatchResult::Win => summary.wins += 1,
                    MatchResult::Draw => summary.draws += 1,
                    MatchResult::Loss => summary.losses += 1,
                }
                summary.goals_for += m.home_score;
                summary.goals_against += m.away_score;
                summary
            })
    }

    pub fn played(&self) -> u32 {
        self.wins + self.draws + self.losses
    }
}

impl TeamSummary {
    /// Summarize the whole history. `matches` is expected newest first, as the
    /// app keeps it.
    pub fn from_matches(matches: &[Match]) -> Self {
        let record = RecordSummary::from_matches(matches);
        let total_matches = matches.len();
        let participants = matches.iter().map(|m| m.participants.len()).sum::<usize>();

        TeamSummary {
            total_matches,
            record,
            total_goals: matches.iter().map(|m| total_count(&m.goals)).sum(),
            total_assists: matches.iter().map(|m| total_count(&m.assists)).sum(),
            win_rate: percentage(record.wins, total_matches as u32).unwrap_or(0),
            average_goals_for: average(f64::from(record.goals_for), total_matches),
            average_goals_against: average(f64::from(record.goals_against), total_matches),
            average_participants: average(participants as f64, total_matches),
            recent: matches.iter().take(RECENT_MATCHES).cloned().collect_vec(),
        }
    }
}

fn total_count(entries: &[PlayerCount]) -> u32 {
    entries.iter().map(|e| e.count).sum()
}

/// Mean rounded to one decimal place, zero for an empty history.
fn average(total: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (total / count as f64 * 10.0).round() / 10.0
}
