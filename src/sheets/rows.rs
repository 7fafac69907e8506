//! Translation between spreadsheet rows and typed records.
//!
//! Reading is lenient: a malformed cell falls back to a default value and
//! never fails the whole read.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{Cell, Row};
use crate::model::{Match, MatchResult, Member, Position};
use crate::permission::Role;

pub const MATCH_HEADER: [&str; 11] = [
    "ID",
    "Date",
    "Season",
    "Opponent",
    "Home Score",
    "Away Score",
    "Result",
    "Participants",
    "Goals",
    "Assists",
    "Last Updated",
];

pub const MEMBER_HEADER: [&str; 7] = [
    "ID",
    "Name",
    "Position",
    "Join Date",
    "Active",
    "Permission",
    "Last Updated",
];

/// Offset added to fallback member ids so they do not overlap fallback match
/// ids generated in the same sync.
pub(crate) const MEMBER_FALLBACK_OFFSET: i64 = 1_000_000;

/// Records that carry a numeric identifier.
pub trait Identified {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

impl Identified for Match {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

impl Identified for Member {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

pub fn header_row(columns: &[&str]) -> Row {
    columns.iter().map(|c| Value::from(*c)).collect()
}

pub fn match_to_row(m: &Match, updated_at: &str) -> Row {
    vec![
        Value::from(m.id.to_string()),
        Value::from(m.date.as_str()),
        Value::from(m.season.as_str()),
        Value::from(m.opponent.as_str()),
        Value::from(m.home_score.to_string()),
        Value::from(m.away_score.to_string()),
        Value::from(m.result.to_string()),
        json_cell(&m.participants),
        json_cell(&m.goals),
        json_cell(&m.assists),
        Value::from(updated_at),
    ]
}

pub fn member_to_row(m: &Member, updated_at: &str) -> Row {
    vec![
        Value::from(m.id.to_string()),
        Value::from(m.name.as_str()),
        Value::from(m.position.to_string()),
        Value::from(m.join_date.as_str()),
        Value::from(if m.active { "TRUE" } else { "FALSE" }),
        Value::from(m.permission.to_string()),
        Value::from(updated_at),
    ]
}

/// Convert the data rows of the matches tab. Rows without an id are skipped;
/// an id that is present but not numeric becomes `now_ms + index`.
pub fn matches_from_rows(rows: &[Row], now_ms: i64) -> Vec<Match> {
    rows.iter()
        .filter(|row| is_truthy(cell(row, 0)))
        .enumerate()
        .map(|(index, row)| match_from_row(row, now_ms + index as i64))
        .collect()
}

/// Convert the data rows of the members tab. Rows without an id are skipped;
/// an id that is present but not numeric becomes
/// `now_ms + 1_000_000 + index`.
pub fn members_from_rows(rows: &[Row], now_ms: i64) -> Vec<Member> {
    rows.iter()
        .filter(|row| is_truthy(cell(row, 0)))
        .enumerate()
        .map(|(index, row)| member_from_row(row, now_ms + MEMBER_FALLBACK_OFFSET + index as i64))
        .collect()
}

fn match_from_row(row: &Row, fallback_id: i64) -> Match {
    let home_score = cell_u32(cell(row, 4));
    let away_score = cell_u32(cell(row, 5));
    let result = cell_string(cell(row, 6))
        .parse::<MatchResult>()
        .unwrap_or_else(|_| MatchResult::from_scores(home_score, away_score));

    Match {
        id: cell_id(cell(row, 0), fallback_id),
        date: cell_string(cell(row, 1)),
        season: cell_string(cell(row, 2)),
        opponent: cell_string(cell(row, 3)),
        home_score,
        away_score,
        result,
        participants: parse_json_cell(cell(row, 7)),
        goals: parse_json_cell(cell(row, 8)),
        assists: parse_json_cell(cell(row, 9)),
        last_updated: cell_optional_string(cell(row, 10)),
    }
}

fn member_from_row(row: &Row, fallback_id: i64) -> Member {
    let position = cell_string(cell(row, 2));
    let position = if position.is_empty() {
        Position::default()
    } else {
        position.parse().unwrap_or_else(|_| {
            debug!(%position, "unknown position code, using default");
            Position::default()
        })
    };

    let permission = cell_string(cell(row, 5));
    let permission = if permission.is_empty() {
        Role::default()
    } else {
        permission.parse().unwrap_or_else(|_| {
            debug!(%permission, "unknown permission label, using default");
            Role::default()
        })
    };

    Member {
        id: cell_id(cell(row, 0), fallback_id),
        name: cell_string(cell(row, 1)),
        position,
        join_date: cell_string(cell(row, 3)),
        active: cell_bool(cell(row, 4)),
        permission,
        last_updated: cell_optional_string(cell(row, 6)),
    }
}

/// Ids occurring more than once, each reported once, in order of their first
/// repetition.
pub fn find_duplicate_ids(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    ids.into_iter()
        .filter(|id| !seen.insert(*id) && reported.insert(*id))
        .collect()
}

/// Give every record that repeats an earlier id in the batch a fresh id.
///
/// Fresh ids count up from `base`, skipping any id used anywhere in the batch,
/// so the outcome only depends on the input and `base`.
pub fn ensure_unique_ids<T: Identified>(items: Vec<T>, base: i64) -> Vec<T> {
    let taken = items.iter().map(Identified::id).collect::<HashSet<_>>();
    let mut seen = HashSet::new();
    let mut next = base;

    items
        .into_iter()
        .map(|mut item| {
            if !seen.insert(item.id()) {
                while taken.contains(&next) || seen.contains(&next) {
                    next += 1;
                }
                debug!(old = item.id(), new = next, "reassigned duplicate id");
                item.set_id(next);
                seen.insert(next);
            }
            item
        })
        .collect()
}

fn json_cell<T: serde::Serialize>(value: &T) -> Cell {
    // Vec<String> and Vec<PlayerCount> always serialize.
    Value::from(serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string()))
}

fn cell(row: &Row, index: usize) -> &Cell {
    static EMPTY: Value = Value::Null;
    row.get(index).unwrap_or(&EMPTY)
}

fn is_truthy(cell: &Cell) -> bool {
    match cell {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn cell_string(cell: &Cell) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn cell_optional_string(cell: &Cell) -> Option<String> {
    Some(cell_string(cell)).filter(|s| !s.is_empty())
}

/// Integer value of a cell. Strings are read like a leading integer prefix,
/// so `"12 pts"` gives 12.
fn cell_int(cell: &Cell) -> Option<i64> {
    match cell {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    }
}

fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

fn cell_id(cell: &Cell, fallback: i64) -> i64 {
    cell_int(cell).filter(|id| *id != 0).unwrap_or(fallback)
}

fn cell_u32(cell: &Cell) -> u32 {
    cell_int(cell)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn cell_bool(cell: &Cell) -> bool {
    match cell {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s.eq_ignore_ascii_case("true") || s == "1",
        _ => false,
    }
}

fn parse_json_cell<T: DeserializeOwned>(cell: &Cell) -> Vec<T> {
    let parsed = match cell {
        Value::String(s) if !s.trim().is_empty() => serde_json::from_str(s),
        Value::Array(_) => serde_json::from_value(cell.clone()),
        _ => return Vec::new(),
    };
    parsed.unwrap_or_else(|e| {
        debug!(error = %e, "unreadable json cell, using empty list");
        Vec::new()
    })
}
