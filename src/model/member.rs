use serde::{Deserialize, Serialize};

use crate::permission::Role;

/// Playing position, stored in the sheet by its two-letter code.
#[derive(
    Default,
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
    strum_macros::EnumIter,
)]
pub enum Position {
    #[default]
    #[strum(serialize = "FW")]
    #[serde(rename = "FW")]
    Forward,
    #[strum(serialize = "MF")]
    #[serde(rename = "MF")]
    Midfield,
    #[strum(serialize = "DF")]
    #[serde(rename = "DF")]
    Defense,
    #[strum(serialize = "GK")]
    #[serde(rename = "GK")]
    Keeper,
}

/// A roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub position: Position,
    pub join_date: String,
    pub active: bool,
    pub permission: Role,
    pub last_updated: Option<String>,
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_position_codes() {
        let codes = Position::iter().map(|p| p.to_string()).collect::<Vec<_>>();
        assert_eq!(codes, vec!["FW", "MF", "DF", "GK"]);
        assert_eq!("GK".parse::<Position>().unwrap(), Position::Keeper);
        assert!("ST".parse::<Position>().is_err());
        assert_eq!(Position::default(), Position::Forward);
    }
}
