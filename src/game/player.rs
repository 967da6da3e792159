use crate::chess::Side;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a participant: a registered user's id or a fresh UUID
/// handed to an anonymous client
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh identity for an anonymous participant
    pub fn anonymous() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque handle of the transport connection a participant is reachable on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connected client as the core sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    /// Registered user rather than an anonymous visitor
    pub authorized: bool,
    pub connection: ConnectionId,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, display_name: impl Into<String>, authorized: bool) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            authorized,
            connection: ConnectionId::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(ParticipantId::anonymous(), "Anonymous", false)
    }
}

/// A participant seated at a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub side: Side,
    pub participant: Participant,
}

impl Player {
    pub fn id(&self) -> &ParticipantId {
        &self.participant.id
    }
}

/// Public view of a player for lobby listings and snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: ParticipantId,
    pub display_name: String,
    pub side: Side,
    pub authorized: bool,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.participant.id.clone(),
            display_name: player.participant.display_name.clone(),
            side: player.side,
            authorized: player.participant.authorized,
        }
    }
}
