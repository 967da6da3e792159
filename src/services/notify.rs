use crate::chess::{BoardSnapshot, MoveRecord, Side};
use crate::game::{GameId, GameSnapshot, GameSummary, LobbyEntry, ParticipantId};
use crate::matchmaking::QueueStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Named events pushed to participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum Event {
    #[serde(rename = "lobby:update")]
    LobbyUpdate { games: Vec<LobbyEntry> },
    #[serde(rename = "game:created")]
    GameCreated { game: LobbyEntry },
    #[serde(rename = "game:start")]
    GameStart { game: GameSnapshot },
    /// Full state resent to a reconnecting player
    #[serde(rename = "game:state")]
    GameState { game: GameSnapshot },
    #[serde(rename = "game:board-update")]
    BoardUpdate {
        game_id: GameId,
        last_move: MoveRecord,
        board: BoardSnapshot,
    },
    #[serde(rename = "game:end")]
    GameEnd { summary: GameSummary },
    #[serde(rename = "game:draw_propose")]
    DrawProposed { game_id: GameId, by: Side },
    #[serde(rename = "game:draw_rejected")]
    DrawRejected { game_id: GameId },
    #[serde(rename = "game:opponent-disconnected")]
    OpponentDisconnected {
        game_id: GameId,
        participant: ParticipantId,
    },
    #[serde(rename = "game:player-reconnected")]
    PlayerReconnected {
        game_id: GameId,
        participant: ParticipantId,
    },
    #[serde(rename = "matchmaking:queue_status")]
    QueueStatus { status: QueueStatus },
    #[serde(rename = "matchmaking:timeout")]
    QueueTimeout,
    #[serde(rename = "matchmaking:rematch_propose")]
    RematchProposed {
        game_id: GameId,
        proposer: ParticipantId,
    },
    #[serde(rename = "matchmaking:rematch_accept")]
    RematchAccepted {
        previous_game: GameId,
        game: GameSnapshot,
    },
    #[serde(rename = "matchmaking:rematch_reject")]
    RematchRejected { game_id: GameId },
}

impl Event {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Event::LobbyUpdate { .. } => "lobby:update",
            Event::GameCreated { .. } => "game:created",
            Event::GameStart { .. } => "game:start",
            Event::GameState { .. } => "game:state",
            Event::BoardUpdate { .. } => "game:board-update",
            Event::GameEnd { .. } => "game:end",
            Event::DrawProposed { .. } => "game:draw_propose",
            Event::DrawRejected { .. } => "game:draw_rejected",
            Event::OpponentDisconnected { .. } => "game:opponent-disconnected",
            Event::PlayerReconnected { .. } => "game:player-reconnected",
            Event::QueueStatus { .. } => "matchmaking:queue_status",
            Event::QueueTimeout => "matchmaking:timeout",
            Event::RematchProposed { .. } => "matchmaking:rematch_propose",
            Event::RematchAccepted { .. } => "matchmaking:rematch_accept",
            Event::RematchRejected { .. } => "matchmaking:rematch_reject",
        }
    }
}

/// Addressee of an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Participant(ParticipantId),
    /// Everyone seated at a game
    Session {
        game_id: GameId,
        participants: Vec<ParticipantId>,
    },
    Everyone,
}

impl Recipient {
    pub fn includes(&self, id: &ParticipantId) -> bool {
        match self {
            Recipient::Participant(target) => target == id,
            Recipient::Session { participants, .. } => participants.contains(id),
            Recipient::Everyone => true,
        }
    }
}

/// Delivery of events to connected participants.
///
/// Implementations must not block: the coordinator calls in after releasing
/// its locks but on the caller's task.
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: Recipient, event: Event);
}

/// Notifier that fans events out over per-participant unbounded channels
#[derive(Default)]
pub struct ChannelNotifier {
    senders: Mutex<HashMap<ParticipantId, UnboundedSender<Event>>>,
}

impl ChannelNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or replace) the participant's event stream
    pub fn subscribe(&self, id: ParticipantId) -> UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, tx);
        rx
    }

    pub fn unsubscribe(&self, id: &ParticipantId) {
        self.senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id);
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, recipient: Recipient, event: Event) {
        let mut senders = self
            .senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Drop streams whose receiver went away
        senders.retain(|id, tx| {
            if !recipient.includes(id) {
                return true;
            }
            let delivered = tx.send(event.clone()).is_ok();
            if !delivered {
                debug!(participant = %id, event = event.name(), "dropping closed event stream");
            }
            delivered
        });
    }
}
