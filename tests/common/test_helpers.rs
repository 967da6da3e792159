//! Coordinator fixtures and a notifier that records what it is asked to send

use mate_arena::chess::MoveRecord;
use mate_arena::coordinator::{CoordinatorSettings, GameCoordinator};
use mate_arena::game::{GameConfig, GameId, ParticipantId, SidePreference};
use mate_arena::matchmaking::{MatchmakingQueue, MatchmakingSettings};
use mate_arena::services::{
    Event, MemoryRatingStore, Notifier, PlayerRating, RatingSettings, RatingStore, Recipient,
    ResolvedIdentity,
};
use mate_arena::storage::errors::Result as StorageResult;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Notifier that keeps every `(recipient, event)` pair in order
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Recipient, Event)>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<(Recipient, Event)> {
        self.sent.lock().unwrap().clone()
    }

    /// Events that reached `id`, oldest first
    pub fn received_by(&self, id: &ParticipantId) -> Vec<Event> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(recipient, _)| recipient.includes(id))
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn names_for(&self, id: &ParticipantId) -> Vec<&'static str> {
        self.received_by(id).iter().map(Event::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, event)| event.name() == name)
            .count()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, recipient: Recipient, event: Event) {
        self.sent.lock().unwrap().push((recipient, event));
    }
}

#[derive(Default)]
struct GateState {
    waiting: bool,
    open: bool,
}

/// Rating store whose lookups for one participant block until the gate is
/// opened, to interleave other actions with a pending `join_queue`
pub struct GatedRatings {
    inner: Arc<MemoryRatingStore>,
    held: ParticipantId,
    state: Mutex<GateState>,
    changed: Condvar,
}

impl GatedRatings {
    pub fn new(inner: Arc<MemoryRatingStore>, held: &str) -> Self {
        Self {
            inner,
            held: ParticipantId::from(held),
            state: Mutex::new(GateState::default()),
            changed: Condvar::new(),
        }
    }

    /// Resolve once a lookup for the held participant is blocked
    pub async fn wait_for_lookup(&self) {
        while !self.state.lock().unwrap().waiting {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    pub fn open(&self) {
        self.state.lock().unwrap().open = true;
        self.changed.notify_all();
    }
}

impl RatingStore for GatedRatings {
    fn get_rating(&self, identity: &ParticipantId) -> StorageResult<i32> {
        if identity == &self.held {
            let mut state = self.state.lock().unwrap();
            state.waiting = true;
            while !state.open {
                state = self.changed.wait(state).unwrap();
            }
        }
        self.inner.get_rating(identity)
    }

    fn record_result(
        &self,
        game_id: GameId,
        winner: &ParticipantId,
        loser: &ParticipantId,
        moves: &[MoveRecord],
    ) -> StorageResult<()> {
        self.inner.record_result(game_id, winner, loser, moves)
    }

    fn record_draw(
        &self,
        game_id: GameId,
        first: &ParticipantId,
        second: &ParticipantId,
        moves: &[MoveRecord],
    ) -> StorageResult<()> {
        self.inner.record_draw(game_id, first, second, moves)
    }

    fn set_connected(&self, identity: &ParticipantId, display_name: &str, connected: bool) -> StorageResult<()> {
        self.inner.set_connected(identity, display_name, connected)
    }

    fn list_connected(&self) -> StorageResult<Vec<PlayerRating>> {
        self.inner.list_connected()
    }
}

/// A coordinator wired to in-memory collaborators
pub struct TestArena {
    pub coordinator: Arc<GameCoordinator>,
    pub notifier: Arc<RecordingNotifier>,
    pub ratings: Arc<MemoryRatingStore>,
}

impl TestArena {
    pub fn new() -> Self {
        Self::with_settings(MatchmakingSettings::default())
    }

    pub fn with_settings(settings: MatchmakingSettings) -> Self {
        let ratings = Arc::new(MemoryRatingStore::new(RatingSettings::default()));
        Self::assemble(settings, ratings.clone(), ratings)
    }

    /// Arena whose rating lookups for `held` wait on the returned gate
    pub fn with_held_rating(held: &str) -> (Self, Arc<GatedRatings>) {
        let ratings = Arc::new(MemoryRatingStore::new(RatingSettings::default()));
        let gate = Arc::new(GatedRatings::new(ratings.clone(), held));
        let arena = Self::assemble(MatchmakingSettings::default(), gate.clone(), ratings);
        (arena, gate)
    }

    fn assemble(
        settings: MatchmakingSettings,
        store: Arc<dyn RatingStore>,
        ratings: Arc<MemoryRatingStore>,
    ) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = Arc::new(GameCoordinator::new(
            MatchmakingQueue::new(settings),
            notifier.clone(),
            store,
            CoordinatorSettings::default(),
        ));
        Self {
            coordinator,
            notifier,
            ratings,
        }
    }

    pub fn connect(&self, id: &str, authorized: bool) -> ParticipantId {
        self.coordinator
            .connect(ResolvedIdentity {
                authorized,
                identity: ParticipantId::from(id),
                display_name: id.to_uppercase(),
            })
            .id
    }

    /// Lobby game with `white` as creator and `black` joining
    pub fn start_lobby_game(&self, white: &ParticipantId, black: &ParticipantId) -> GameId {
        let entry = self
            .coordinator
            .create_game(
                white,
                GameConfig {
                    side: SidePreference::White,
                },
            )
            .expect("create game");
        self.coordinator
            .join_game(black, entry.id)
            .expect("join game");
        entry.id
    }

    pub fn play(&self, game_id: GameId, moves: &[(&ParticipantId, &str, &str)]) {
        for (player, piece, to) in moves {
            self.coordinator
                .make_move(player, game_id, piece, to)
                .unwrap_or_else(|e| panic!("{} {} to {} rejected: {}", player, piece, to, e));
        }
    }
}

impl Default for TestArena {
    fn default() -> Self {
        Self::new()
    }
}
