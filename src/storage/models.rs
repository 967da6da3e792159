use crate::chess::MoveRecord;
use crate::game::ParticipantId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a stored game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredResult {
    /// `first_player` beat `second_player`
    Win,
    Draw,
}

impl StoredResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoredResult::Win => "win",
            StoredResult::Draw => "draw",
        }
    }
}

impl FromStr for StoredResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(StoredResult::Win),
            "draw" => Ok(StoredResult::Draw),
            other => Err(format!("unknown result '{}'", other)),
        }
    }
}

/// A finished rated game as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredGame {
    pub id: String,
    pub first_player: ParticipantId,
    pub second_player: ParticipantId,
    pub result: StoredResult,
    pub moves: Vec<MoveRecord>,
    pub created_at: i64,
}

impl StoredGame {
    pub fn winner(&self) -> Option<&ParticipantId> {
        match self.result {
            StoredResult::Win => Some(&self.first_player),
            StoredResult::Draw => None,
        }
    }
}
