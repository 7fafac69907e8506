use serde::Serialize;

use crate::model::{Match, MatchResult, Member, PlayerCount, Position};
use crate::permission::Role;

/// Competition label a fresh match form starts with.
pub const DEFAULT_SEASON: &str = "Spring Cup";

/// Match registration form contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchDraft {
    pub date: String,
    pub season: String,
    pub opponent: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub participants: Vec<String>,
    pub goals: Vec<PlayerCount>,
    pub assists: Vec<PlayerCount>,
}

impl Default for MatchDraft {
    fn default() -> Self {
        Self {
            date: String::new(),
            season: DEFAULT_SEASON.to_string(),
            opponent: String::new(),
            home_score: None,
            away_score: None,
            participants: Vec::new(),
            goals: Vec::new(),
            assists: Vec::new(),
        }
    }
}

impl MatchDraft {
    /// Returns `false` when the name is blank or already listed.
    pub fn add_participant(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.participants.iter().any(|p| p == name) {
            return false;
        }
        self.participants.push(name.to_string());
        true
    }

    pub fn remove_participant(&mut self, name: &str) {
        self.participants.retain(|p| p != name);
    }

    pub fn add_goal(&mut self, player: &str, count: u32) -> bool {
        merge_count(&mut self.goals, player, count)
    }

    pub fn remove_goal(&mut self, player: &str) {
        self.goals.retain(|g| g.player != player);
    }

    pub fn add_assist(&mut self, player: &str, count: u32) -> bool {
        merge_count(&mut self.assists, player, count)
    }

    pub fn remove_assist(&mut self, player: &str) {
        self.assists.retain(|a| a.player != player);
    }

    /// Date, opponent and both scores are filled in.
    pub fn is_complete(&self) -> bool {
        !self.date.trim().is_empty()
            && !self.opponent.trim().is_empty()
            && self.home_score.is_some()
            && self.away_score.is_some()
    }

    /// The match this draft describes, or `None` while it is incomplete.
    pub fn to_match(&self, id: i64) -> Option<Match> {
        if !self.is_complete() {
            return None;
        }
        let home_score = self.home_score?;
        let away_score = self.away_score?;
        Some(Match {
            id,
            date: self.date.trim().to_string(),
            season: self.season.clone(),
            opponent: self.opponent.trim().to_string(),
            home_score,
            away_score,
            result: MatchResult::from_scores(home_score, away_score),
            participants: self.participants.clone(),
            goals: self.goals.clone(),
            assists: self.assists.clone(),
            last_updated: None,
        })
    }
}

/// A second entry for the same player adds to the first. Zero counts and
/// blank names are ignored.
fn merge_count(entries: &mut Vec<PlayerCount>, player: &str, count: u32) -> bool {
    let player = player.trim();
    if player.is_empty() || count == 0 {
        return false;
    }
    match entries.iter_mut().find(|e| e.player == player) {
        Some(entry) => entry.count += count,
        None => entries.push(PlayerCount::new(player, count)),
    }
    true
}

/// Add-member form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberDraft {
    pub name: String,
    pub position: Position,
    pub join_date: String,
}

impl MemberDraft {
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.join_date.trim().is_empty()
    }

    /// New members start active with the default role.
    pub fn to_member(&self, id: i64) -> Option<Member> {
        self.is_complete().then(|| Member {
            id,
            name: self.name.trim().to_string(),
            position: self.position,
            join_date: self.join_date.trim().to_string(),
            active: true,
            permission: Role::default(),
            last_updated: None,
        })
    }
}
