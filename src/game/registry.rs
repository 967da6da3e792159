use super::error::{GameError, GameResult};
use super::player::ParticipantId;
use super::session::{GameId, LobbyEntry, SharedSession};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

struct PendingEntry {
    session: SharedSession,
    lobby: LobbyEntry,
}

struct ActiveEntry {
    session: SharedSession,
    participants: Vec<ParticipantId>,
}

#[derive(Default)]
struct Inner {
    /// Awaiting a second player, in creation order
    pending: Vec<PendingEntry>,
    active: HashMap<GameId, ActiveEntry>,
}

impl Inner {
    /// A participant sits in at most one active game
    fn ensure_idle(&self, participants: &[ParticipantId]) -> GameResult<()> {
        for (id, entry) in &self.active {
            if let Some(busy) = participants.iter().find(|&p| entry.participants.contains(p)) {
                return Err(GameError::conflict(format!("{} is already playing game {}", busy, id)));
            }
        }
        Ok(())
    }
}

/// Pending and active sessions, keyed by game id.
///
/// The registry keeps its own copy of who plays where, so it never has to
/// lock a session; callers must not hold a session lock while calling in.
#[derive(Default)]
pub struct GameRegistry {
    inner: Mutex<Inner>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// List a freshly created session in the lobby. Fails if its creator
    /// is already playing.
    pub fn insert_pending(&self, session: SharedSession, lobby: LobbyEntry) -> GameResult<()> {
        let mut inner = self.inner();
        let creators: Vec<ParticipantId> = lobby.players.iter().map(|p| p.id.clone()).collect();
        inner.ensure_idle(&creators)?;
        debug!(game = %lobby.id, "listed in lobby");
        inner.pending.push(PendingEntry { session, lobby });
        Ok(())
    }

    /// Register a session that is already Active, skipping the lobby.
    /// Fails if any participant is already playing.
    pub fn insert_active(
        &self,
        id: GameId,
        session: SharedSession,
        participants: Vec<ParticipantId>,
    ) -> GameResult<()> {
        let mut inner = self.inner();
        inner.ensure_idle(&participants)?;
        debug!(game = %id, "registered active game");
        inner.active.insert(
            id,
            ActiveEntry {
                session,
                participants,
            },
        );
        Ok(())
    }

    pub fn lobby(&self) -> Vec<LobbyEntry> {
        self.inner()
            .pending
            .iter()
            .map(|entry| entry.lobby.clone())
            .collect()
    }

    pub fn pending(&self, id: GameId) -> GameResult<SharedSession> {
        self.inner()
            .pending
            .iter()
            .find(|entry| entry.lobby.id == id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| GameError::not_found(format!("pending game {}", id)))
    }

    /// Move a session from the lobby to the active set. Fails, leaving the
    /// listing in place, if any participant is already playing.
    pub fn promote(&self, id: GameId, participants: Vec<ParticipantId>) -> GameResult<SharedSession> {
        let mut inner = self.inner();
        let index = inner
            .pending
            .iter()
            .position(|entry| entry.lobby.id == id)
            .ok_or_else(|| GameError::not_found(format!("pending game {}", id)))?;
        inner.ensure_idle(&participants)?;
        let entry = inner.pending.remove(index);
        inner.active.insert(
            id,
            ActiveEntry {
                session: entry.session.clone(),
                participants,
            },
        );
        debug!(game = %id, "promoted to active");
        Ok(entry.session)
    }

    pub fn active(&self, id: GameId) -> GameResult<SharedSession> {
        self.inner()
            .active
            .get(&id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| GameError::not_found(format!("game {}", id)))
    }

    /// Drop a finished session from the active set
    pub fn retire(&self, id: GameId) -> GameResult<SharedSession> {
        let entry = self
            .inner()
            .active
            .remove(&id)
            .ok_or_else(|| GameError::not_found(format!("game {}", id)))?;
        debug!(game = %id, "retired");
        Ok(entry.session)
    }

    /// The active session `participant` is playing in
    pub fn find_by_participant(&self, participant: &ParticipantId) -> Option<(GameId, SharedSession)> {
        self.inner()
            .active
            .iter()
            .find(|(_, entry)| entry.participants.contains(participant))
            .map(|(id, entry)| (*id, entry.session.clone()))
    }

    /// Remove every lobby listing created by `participant`
    pub fn remove_pending_by(&self, participant: &ParticipantId) -> Vec<GameId> {
        let mut inner = self.inner();
        let (removed, kept): (Vec<_>, Vec<_>) = inner
            .pending
            .drain(..)
            .partition(|entry| entry.lobby.players.iter().any(|p| &p.id == participant));
        inner.pending = kept;
        removed.into_iter().map(|entry| entry.lobby.id).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.inner().pending.len()
    }

    pub fn active_count(&self) -> usize {
        self.inner().active.len()
    }
}
