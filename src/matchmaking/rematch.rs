use crate::chess::Side;
use crate::game::{GameError, GameId, GameResult, GameSummary, ParticipantId};
use std::collections::HashMap;
use tokio::time::Instant;

/// A pending offer to play a finished game again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RematchProposal {
    pub game_id: GameId,
    pub proposer: ParticipantId,
    pub proposed_at: Instant,
}

/// Live rematch proposals, at most one per finished game
#[derive(Debug, Default)]
pub struct RematchBook {
    proposals: HashMap<GameId, RematchProposal>,
}

impl RematchBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn propose(&mut self, game_id: GameId, proposer: ParticipantId, now: Instant) -> GameResult<()> {
        if self.proposals.contains_key(&game_id) {
            return Err(GameError::conflict(format!(
                "a rematch is already proposed for game {}",
                game_id
            )));
        }
        self.proposals.insert(
            game_id,
            RematchProposal {
                game_id,
                proposer,
                proposed_at: now,
            },
        );
        Ok(())
    }

    /// Take the proposal for `game_id` on behalf of `accepter`, who must not
    /// be the proposer
    pub fn accept(&mut self, game_id: GameId, accepter: &ParticipantId) -> GameResult<RematchProposal> {
        match self.proposals.get(&game_id) {
            None => Err(GameError::not_found(format!(
                "rematch proposal for game {}",
                game_id
            ))),
            Some(proposal) if &proposal.proposer == accepter => {
                Err(GameError::conflict("cannot accept your own rematch proposal"))
            }
            Some(_) => self
                .proposals
                .remove(&game_id)
                .ok_or_else(|| GameError::not_found(format!("rematch proposal for game {}", game_id))),
        }
    }

    /// Drop the proposal, if any
    pub fn reject(&mut self, game_id: GameId) -> Option<RematchProposal> {
        self.proposals.remove(&game_id)
    }

    pub fn get(&self, game_id: GameId) -> Option<&RematchProposal> {
        self.proposals.get(&game_id)
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}

/// Seating for a rematch: every player of `previous` on the other side
pub fn swapped_sides(previous: &GameSummary) -> Vec<(ParticipantId, Side)> {
    previous
        .players
        .iter()
        .map(|player| (player.id.clone(), player.side.opposite()))
        .collect()
}
