use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::common::PlayerCount;

/// Date formats accepted when reading a match date back from the sheet.
pub(crate) const MATCH_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Outcome of a match from the club's point of view.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchResult {
    Win,
    Draw,
    Loss,
}

impl MatchResult {
    /// Derive the result label from the two scores.
    pub fn from_scores(home_score: u32, away_score: u32) -> Self {
        match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => MatchResult::Win,
            std::cmp::Ordering::Less => MatchResult::Loss,
            std::cmp::Ordering::Equal => MatchResult::Draw,
        }
    }
}

/// A recorded game: score, date, who played and who contributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub date: String,
    pub season: String,
    pub opponent: String,
    pub home_score: u32,
    pub away_score: u32,
    pub result: MatchResult,
    pub participants: Vec<String>,
    pub goals: Vec<PlayerCount>,
    pub assists: Vec<PlayerCount>,
    /// Timestamp column maintained by whoever wrote the row last.
    pub last_updated: Option<String>,
}

impl Match {
    /// The date the match was played on, if the stored text is a known format.
    pub fn played_on(&self) -> Option<NaiveDate> {
        let date = self.date.trim();
        MATCH_DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
            .or_else(|| {
                DateTime::parse_from_rfc3339(date)
                    .ok()
                    .map(|d| d.date_naive())
            })
    }

    pub fn year(&self) -> Option<i32> {
        self.played_on().map(|d| d.year())
    }

}
