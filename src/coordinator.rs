//! Orchestration of sessions, the lobby and matchmaking in response to
//! participant actions.
//!
//! Lock discipline: a session lock is only held inside a block that touches
//! that session alone. Registry, matchmaking, notifier and store calls all
//! happen after it is released.

use crate::chess::{MoveRecord, MoveRequest, Side};
use crate::game::{
    lock_session, GameConfig, GameError, GameId, GameRegistry, GameResult, GameSession,
    GameSnapshot, GameSummary, LobbyEntry, Outcome, Participant, ParticipantId, SharedSession,
    SidePreference,
};
use crate::matchmaking::{swapped_sides, MatchmakingQueue, Pairing, QueueEntry, QueueStatus};
use crate::services::{
    Event, Notifier, PlayerRating, RatingStore, Recipient, ResolvedIdentity,
};
use crate::storage::{self, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Result of joining the matchmaking queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueOutcome {
    /// Paired right away
    Matched { game_id: GameId },
    Waiting { status: QueueStatus },
}

/// Coordinator tuning that is not owned by matchmaking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Finished-game summaries kept for rematch lookups
    pub retained_results: usize,
    /// Rating used when the store cannot be reached
    pub fallback_rating: i32,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            retained_results: 256,
            fallback_rating: 1200,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct GameCoordinator {
    registry: GameRegistry,
    matchmaking: MatchmakingQueue,
    notifier: Arc<dyn Notifier>,
    ratings: Arc<dyn RatingStore>,
    connections: Mutex<HashMap<ParticipantId, Participant>>,
    /// Most recent finished games, oldest first
    finished: Mutex<VecDeque<GameSummary>>,
    settings: CoordinatorSettings,
    persistence: Mutex<Vec<JoinHandle<()>>>,
}

impl GameCoordinator {
    pub fn new(
        matchmaking: MatchmakingQueue,
        notifier: Arc<dyn Notifier>,
        ratings: Arc<dyn RatingStore>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            registry: GameRegistry::new(),
            matchmaking,
            notifier,
            ratings,
            connections: Mutex::new(HashMap::new()),
            finished: Mutex::new(VecDeque::new()),
            settings: CoordinatorSettings {
                retained_results: settings.retained_results.max(1),
                ..settings
            },
            persistence: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    pub fn matchmaking(&self) -> &MatchmakingQueue {
        &self.matchmaking
    }

    fn participant(&self, id: &ParticipantId) -> GameResult<Participant> {
        lock(&self.connections)
            .get(id)
            .cloned()
            .ok_or_else(|| GameError::not_found(format!("participant {} is not connected", id)))
    }

    pub fn connected(&self, id: &ParticipantId) -> Option<Participant> {
        lock(&self.connections).get(id).cloned()
    }

    fn ensure_idle(&self, id: &ParticipantId) -> GameResult<()> {
        match self.registry.find_by_participant(id) {
            Some((game_id, _)) => Err(GameError::conflict(format!(
                "{} is already playing game {}",
                id, game_id
            ))),
            None => Ok(()),
        }
    }

    fn notify(&self, recipient: Recipient, event: Event) {
        debug!(event = event.name(), "notify");
        self.notifier.notify(recipient, event);
    }

    fn broadcast_lobby(&self) {
        self.notify(
            Recipient::Everyone,
            Event::LobbyUpdate {
                games: self.registry.lobby(),
            },
        );
    }

    /// Run a store call on the blocking pool. Failures are logged, never
    /// surfaced to the participant.
    fn hand_off<F>(&self, what: &'static str, job: F)
    where
        F: FnOnce(&dyn RatingStore) -> storage::errors::Result<()> + Send + 'static,
    {
        let store = self.ratings.clone();
        let run = move || {
            if let Err(e) = job(store.as_ref()) {
                error!(error = %e, what, "persistence failed");
            }
        };
        match Handle::try_current() {
            Ok(handle) => {
                let task = handle.spawn_blocking(run);
                let mut pending = lock(&self.persistence);
                pending.retain(|task| !task.is_finished());
                pending.push(task);
            }
            Err(_) => run(),
        }
    }

    /// Wait for every persistence hand-off issued so far
    pub async fn flush(&self) {
        let pending: Vec<JoinHandle<()>> = lock(&self.persistence).drain(..).collect();
        for task in pending {
            if let Err(e) = task.await {
                error!(error = %e, "persistence task panicked");
            }
        }
    }

    /// Register a connected client and send it the lobby
    pub fn connect(&self, resolved: ResolvedIdentity) -> Participant {
        let participant = resolved.into_participant();
        info!(participant = %participant.id, authorized = participant.authorized, "connected");
        lock(&self.connections).insert(participant.id.clone(), participant.clone());

        if participant.authorized {
            let (id, name) = (participant.id.clone(), participant.display_name.clone());
            self.hand_off("mark connected", move |store| store.set_connected(&id, &name, true));
        }
        self.notify(
            Recipient::Participant(participant.id.clone()),
            Event::LobbyUpdate {
                games: self.registry.lobby(),
            },
        );
        participant
    }

    /// Forget a client: withdraw it from the queue and the lobby and tell
    /// its opponent. An active game stays active.
    pub fn disconnect(&self, id: &ParticipantId) {
        let Some(participant) = lock(&self.connections).remove(id) else {
            return;
        };
        info!(participant = %id, "disconnected");

        self.matchmaking.dequeue(id);
        if !self.registry.remove_pending_by(id).is_empty() {
            self.broadcast_lobby();
        }
        if let Some((game_id, session)) = self.registry.find_by_participant(id) {
            let opponent = lock_session(&session).opponent_of(id).map(|p| p.id().clone());
            if let Some(opponent) = opponent {
                self.notify(
                    Recipient::Participant(opponent),
                    Event::OpponentDisconnected {
                        game_id,
                        participant: id.clone(),
                    },
                );
            }
        }
        if participant.authorized {
            let (id, name) = (participant.id, participant.display_name);
            self.hand_off("mark disconnected", move |store| store.set_connected(&id, &name, false));
        }
    }

    /// Connected registered players with their ratings
    pub async fn connected_players(&self) -> storage::errors::Result<Vec<PlayerRating>> {
        let store = self.ratings.clone();
        tokio::task::spawn_blocking(move || store.list_connected())
            .await
            .map_err(|e| StorageError::TaskFailed(e.to_string()))?
    }

    pub fn lobby(&self) -> Vec<LobbyEntry> {
        self.registry.lobby()
    }

    #[instrument(skip(self), fields(participant = %id))]
    pub fn create_game(&self, id: &ParticipantId, config: GameConfig) -> GameResult<LobbyEntry> {
        let participant = self.participant(id)?;
        self.ensure_idle(id)?;

        let session = GameSession::create(participant, config);
        let entry = session.lobby_entry();
        self.registry
            .insert_pending(Arc::new(Mutex::new(session)), entry.clone())?;

        self.notify(
            Recipient::Participant(id.clone()),
            Event::GameCreated {
                game: entry.clone(),
            },
        );
        self.broadcast_lobby();
        Ok(entry)
    }

    #[instrument(skip(self), fields(participant = %id, game = %game_id))]
    pub fn join_game(&self, id: &ParticipantId, game_id: GameId) -> GameResult<GameSnapshot> {
        let participant = self.participant(id)?;
        self.ensure_idle(id)?;
        let session = self.registry.pending(game_id)?;

        let mut participants = lock_session(&session).participant_ids();
        if participants.contains(id) {
            return Err(GameError::conflict("cannot join your own game"));
        }
        participants.push(id.clone());

        // Claims the listing and re-checks that nobody is already playing
        self.registry.promote(game_id, participants.clone())?;
        let started = {
            let mut session = lock_session(&session);
            let started = session
                .add_second_player(participant)
                .and_then(|_| session.start());
            started
        };
        if let Err(e) = started {
            warn!(error = %e, "promoted game failed to start");
            self.registry.retire(game_id).ok();
            return Err(e);
        }
        self.seat(&participants);

        let snapshot = lock_session(&session).snapshot();
        self.notify(
            Recipient::Session {
                game_id,
                participants,
            },
            Event::GameStart {
                game: snapshot.clone(),
            },
        );
        self.broadcast_lobby();
        Ok(snapshot)
    }

    /// Withdraw freshly seated players from the queue and their other
    /// lobby listings
    fn seat(&self, participants: &[ParticipantId]) {
        let mut lobby_changed = false;
        for id in participants {
            self.matchmaking.dequeue(id);
            lobby_changed |= !self.registry.remove_pending_by(id).is_empty();
        }
        if lobby_changed {
            self.broadcast_lobby();
        }
    }

    /// Resend the full game to a reconnecting participant
    #[instrument(skip(self), fields(participant = %id))]
    pub fn rejoin(&self, id: &ParticipantId) -> GameResult<GameSnapshot> {
        let participant = self.participant(id)?;
        let (game_id, session) = self
            .registry
            .find_by_participant(id)
            .ok_or_else(|| GameError::not_found(format!("active game for {}", id)))?;

        let (snapshot, participants) = {
            let mut session = lock_session(&session);
            session.rebind_connection(id, participant.connection)?;
            (session.snapshot(), session.participant_ids())
        };
        info!(game = %game_id, "rejoined");

        self.notify(
            Recipient::Participant(id.clone()),
            Event::GameState {
                game: snapshot.clone(),
            },
        );
        self.notify(
            Recipient::Session {
                game_id,
                participants: participants.into_iter().filter(|p| p != id).collect(),
            },
            Event::PlayerReconnected {
                game_id,
                participant: id.clone(),
            },
        );
        Ok(snapshot)
    }

    /// Apply a move given in notation, e.g. `("P5", "e4")`
    pub fn make_move(
        &self,
        id: &ParticipantId,
        game_id: GameId,
        piece: &str,
        to: &str,
    ) -> GameResult<MoveRecord> {
        let request = MoveRequest::parse(piece, to)?;
        let session = self.registry.active(game_id)?;

        let (record, board, participants, summary) = {
            let mut session = lock_session(&session);
            let record = session.apply_move(id, request.piece, request.to)?;
            (
                record,
                session.snapshot().board,
                session.participant_ids(),
                session.summary(),
            )
        };

        self.notify(
            Recipient::Session {
                game_id,
                participants,
            },
            Event::BoardUpdate {
                game_id,
                last_move: record,
                board,
            },
        );
        if let Some(summary) = summary {
            self.finish(summary);
        }
        Ok(record)
    }

    pub fn resign(&self, id: &ParticipantId, game_id: GameId) -> GameResult<GameSummary> {
        self.conclude(game_id, |session| session.resign(id).map(|_| ()))
    }

    pub fn leave(&self, id: &ParticipantId, game_id: GameId) -> GameResult<GameSummary> {
        self.conclude(game_id, |session| session.leave(id).map(|_| ()))
    }

    pub fn propose_draw(&self, id: &ParticipantId, game_id: GameId) -> GameResult<()> {
        let session = self.registry.active(game_id)?;
        let (side, participants) = {
            let mut session = lock_session(&session);
            let side = side_in(&session, id)?;
            session.propose_draw(side)?;
            (side, session.participant_ids())
        };
        self.notify(
            Recipient::Session {
                game_id,
                participants,
            },
            Event::DrawProposed { game_id, by: side },
        );
        Ok(())
    }

    pub fn accept_draw(&self, id: &ParticipantId, game_id: GameId) -> GameResult<GameSummary> {
        self.conclude(game_id, |session| {
            let side = side_in(session, id)?;
            session.accept_draw(side).map(|_| ())
        })
    }

    pub fn reject_draw(&self, id: &ParticipantId, game_id: GameId) -> GameResult<()> {
        let session = self.registry.active(game_id)?;
        let participants = {
            let mut session = lock_session(&session);
            side_in(&session, id)?;
            session.reject_draw();
            session.participant_ids()
        };
        self.notify(
            Recipient::Session {
                game_id,
                participants,
            },
            Event::DrawRejected { game_id },
        );
        Ok(())
    }

    /// Run a terminal transition on an active session and finish it
    fn conclude<F>(&self, game_id: GameId, transition: F) -> GameResult<GameSummary>
    where
        F: FnOnce(&mut GameSession) -> GameResult<()>,
    {
        let session = self.registry.active(game_id)?;
        let summary = {
            let mut session = lock_session(&session);
            transition(&mut *session)?;
            session.summary()
        }
        .ok_or_else(|| GameError::conflict(format!("game {} did not end", game_id)))?;
        self.finish(summary.clone());
        Ok(summary)
    }

    /// Retire a finished session, announce it and hand it to persistence
    fn finish(&self, summary: GameSummary) {
        if let Err(e) = self.registry.retire(summary.id) {
            warn!(game = %summary.id, error = %e, "finished game was not active");
        }
        info!(game = %summary.id, reason = ?summary.reason, "game ended");

        {
            let mut finished = lock(&self.finished);
            finished.push_back(summary.clone());
            while finished.len() > self.settings.retained_results {
                finished.pop_front();
            }
        }

        let participants = summary.players.iter().map(|p| p.id.clone()).collect();
        self.notify(
            Recipient::Session {
                game_id: summary.id,
                participants,
            },
            Event::GameEnd {
                summary: summary.clone(),
            },
        );

        if !summary.is_rated() {
            debug!(game = %summary.id, "unrated game, not recorded");
            return;
        }
        match summary.outcome.clone() {
            Outcome::Decisive { winner, loser, .. } => {
                self.hand_off("record result", move |store| {
                    store.record_result(summary.id, &winner, &loser, &summary.moves)
                });
            }
            Outcome::Draw => {
                let (first, second) = (summary.players[0].id.clone(), summary.players[1].id.clone());
                self.hand_off("record draw", move |store| {
                    store.record_draw(summary.id, &first, &second, &summary.moves)
                });
            }
        }
    }

    pub fn finished_game(&self, game_id: GameId) -> Option<GameSummary> {
        lock(&self.finished).iter().rev().find(|s| s.id == game_id).cloned()
    }

    /// Queue a participant for pairing and try to match right away
    pub async fn join_queue(
        &self,
        id: &ParticipantId,
        preference: SidePreference,
    ) -> GameResult<QueueOutcome> {
        self.participant(id)?;
        self.ensure_idle(id)?;

        let store = self.ratings.clone();
        let lookup = id.clone();
        let rating = match tokio::task::spawn_blocking(move || store.get_rating(&lookup)).await {
            Ok(Ok(rating)) => rating,
            Ok(Err(e)) => {
                warn!(participant = %id, error = %e, "rating lookup failed, using default");
                self.settings.fallback_rating
            }
            Err(e) => {
                warn!(participant = %id, error = %e, "rating lookup task failed, using default");
                self.settings.fallback_rating
            }
        };

        // The lookup may have raced a seat or a disconnect
        let participant = self.participant(id)?;
        self.ensure_idle(id)?;
        self.matchmaking
            .enqueue(participant, rating, preference, self.queue_timeout_notice());
        if let Err(e) = self.participant(id).and_then(|_| self.ensure_idle(id)) {
            if self.matchmaking.dequeue(id).is_some() {
                return Err(e);
            }
        }

        self.match_waiting();
        if let Some(status) = self.matchmaking.status(id) {
            self.notify(
                Recipient::Participant(id.clone()),
                Event::QueueStatus { status },
            );
            return Ok(QueueOutcome::Waiting { status });
        }
        self.registry
            .find_by_participant(id)
            .map(|(game_id, _)| QueueOutcome::Matched { game_id })
            .ok_or_else(|| GameError::not_found(format!("{} left the queue", id)))
    }

    pub fn leave_queue(&self, id: &ParticipantId) -> bool {
        self.matchmaking.dequeue(id).is_some()
    }

    /// Pair every compatible couple currently waiting
    pub fn match_waiting(&self) -> Vec<GameId> {
        let mut started = Vec::new();
        while let Some(pairing) = self.matchmaking.find_match() {
            if let Some(game_id) = self.start_paired_game(pairing) {
                started.push(game_id);
            }
        }
        started
    }

    /// Start a game for a pairing. If it cannot be seated, entries of
    /// players still connected and idle go back to the queue.
    fn start_paired_game(&self, pairing: Pairing) -> Option<GameId> {
        let Pairing { white, black } = pairing;
        let config = GameConfig {
            side: SidePreference::White,
        };
        match self.start_seated_game(white.participant.clone(), black.participant.clone(), config) {
            Ok(game_id) => Some(game_id),
            Err(e) => {
                warn!(white = %white.id(), black = %black.id(), error = %e, "paired game not started");
                for entry in [white, black] {
                    let id = entry.id().clone();
                    if self.connected(&id).is_some() && self.ensure_idle(&id).is_ok() {
                        self.matchmaking.restore(entry, self.queue_timeout_notice());
                    }
                }
                None
            }
        }
    }

    /// Create, seat and start a game that skips the lobby
    fn start_seated_game(
        &self,
        white: Participant,
        black: Participant,
        config: GameConfig,
    ) -> GameResult<GameId> {
        let mut session = GameSession::create_with_side(white, Side::White, config);
        session.add_second_player(black).and_then(|_| session.start())?;
        let game_id = session.id();
        let participants = session.participant_ids();
        let snapshot = session.snapshot();

        let shared: SharedSession = Arc::new(Mutex::new(session));
        self.registry
            .insert_active(game_id, shared, participants.clone())?;
        self.seat(&participants);
        self.notify(
            Recipient::Session {
                game_id,
                participants,
            },
            Event::GameStart { game: snapshot },
        );
        Ok(game_id)
    }

    fn queue_timeout_notice(&self) -> impl FnOnce(QueueEntry) + Send + 'static {
        let notifier = self.notifier.clone();
        move |entry: QueueEntry| {
            notifier.notify(
                Recipient::Participant(entry.participant.id),
                Event::QueueTimeout,
            );
        }
    }

    /// Push queue status to everyone waiting
    pub fn push_queue_statuses(&self) {
        for (id, status) in self.matchmaking.statuses() {
            self.notify(Recipient::Participant(id), Event::QueueStatus { status });
        }
    }

    /// Periodic match sweep and status push
    pub fn spawn_matchmaker(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(coordinator.matchmaking.settings().status_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let started = coordinator.match_waiting();
                if !started.is_empty() {
                    debug!(games = started.len(), "matchmaker sweep started games");
                }
                coordinator.push_queue_statuses();
            }
        })
    }

    fn finished_for(&self, id: &ParticipantId, game_id: GameId) -> GameResult<GameSummary> {
        let summary = self
            .finished_game(game_id)
            .ok_or_else(|| GameError::not_found(format!("finished game {}", game_id)))?;
        if summary.side_of(id).is_none() {
            return Err(GameError::not_found(format!(
                "{} did not play game {}",
                id, game_id
            )));
        }
        Ok(summary)
    }

    pub fn propose_rematch(&self, id: &ParticipantId, game_id: GameId) -> GameResult<()> {
        let summary = self.finished_for(id, game_id)?;
        let participants: Vec<ParticipantId> = summary.players.iter().map(|p| p.id.clone()).collect();

        let notifier = self.notifier.clone();
        let expired_to = participants.clone();
        self.matchmaking
            .propose_rematch(game_id, id.clone(), move |_| {
                notifier.notify(
                    Recipient::Session {
                        game_id,
                        participants: expired_to,
                    },
                    Event::RematchRejected { game_id },
                );
            })?;

        self.notify(
            Recipient::Session {
                game_id,
                participants,
            },
            Event::RematchProposed {
                game_id,
                proposer: id.clone(),
            },
        );
        Ok(())
    }

    /// Accept a rematch: a new game between the same players, sides swapped
    pub fn accept_rematch(&self, id: &ParticipantId, game_id: GameId) -> GameResult<GameSnapshot> {
        let summary = self.finished_for(id, game_id)?;
        for player in &summary.players {
            self.ensure_idle(&player.id)?;
        }
        self.matchmaking.accept_rematch(game_id, id)?;

        let seat = |side: Side| -> GameResult<Participant> {
            let (player_id, _) = swapped_sides(&summary)
                .into_iter()
                .find(|(_, s)| *s == side)
                .ok_or_else(|| GameError::not_found(format!("{} player of game {}", side, game_id)))?;
            Ok(self.connected(&player_id).unwrap_or_else(|| {
                let previous = summary.players.iter().find(|p| p.id == player_id);
                Participant::new(
                    player_id.clone(),
                    previous.map_or_else(|| "Anonymous".to_string(), |p| p.display_name.clone()),
                    previous.is_some_and(|p| p.authorized),
                )
            }))
        };
        let (white, black) = (seat(Side::White)?, seat(Side::Black)?);

        let new_game = self.start_seated_game(white, black, summary.config)?;
        let session = self.registry.active(new_game)?;
        let snapshot = lock_session(&session).snapshot();

        self.notify(
            Recipient::Session {
                game_id: new_game,
                participants: snapshot.players.iter().map(|p| p.id.clone()).collect(),
            },
            Event::RematchAccepted {
                previous_game: game_id,
                game: snapshot.clone(),
            },
        );
        Ok(snapshot)
    }

    pub fn reject_rematch(&self, id: &ParticipantId, game_id: GameId) -> GameResult<()> {
        let summary = self.finished_for(id, game_id)?;
        if self.matchmaking.reject_rematch(game_id).is_some() {
            self.notify(
                Recipient::Session {
                    game_id,
                    participants: summary.players.iter().map(|p| p.id.clone()).collect(),
                },
                Event::RematchRejected { game_id },
            );
        }
        Ok(())
    }
}

fn side_in(session: &GameSession, id: &ParticipantId) -> GameResult<Side> {
    session
        .side_of(id)
        .ok_or_else(|| GameError::not_found(format!("{} is not playing game {}", id, session.id())))
}
