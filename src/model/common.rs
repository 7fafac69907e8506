use serde::{Deserialize, Serialize};

/// A per-player counter attached to a match (goals scored, assists made).
///
/// Serialized as `{"player": "...", "count": n}` inside the sheet cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCount {
    pub player: String,
    pub count: u32,
}

impl PlayerCount {
    pub fn new(player: impl Into<String>, count: u32) -> Self {
        Self {
            player: player.into(),
            count,
        }
    }
}
