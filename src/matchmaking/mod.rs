//! Skill-based pairing of waiting participants and post-game rematches.
//!
//! [`MatchmakingQueue`] is the shared service: the waiting queue and the
//! rematch book each sit behind their own lock, and every entry carries a
//! cancellable timer.

pub mod queue;
pub mod rematch;
pub mod timeouts;

pub use queue::{reconcile_sides, Pairing, QueueEntry, QueueStatus, WaitingQueue};
pub use rematch::{swapped_sides, RematchBook, RematchProposal};
pub use timeouts::Timeouts;

use crate::game::{GameId, GameResult, Participant, ParticipantId, SidePreference};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::{Duration, Instant};
use tracing::info;

/// Tuning of the matchmaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchmakingSettings {
    /// Acceptance range of a fresh entry, in rating points
    pub base_range: u32,
    /// Added to the range every `widen_interval` an entry has waited
    pub range_increment: u32,
    pub widen_interval: Duration,
    /// Wait before an unmatched entry is evicted
    pub max_wait: Duration,
    /// Lifetime of a rematch proposal
    pub rematch_timeout: Duration,
    /// Period of the status push and match sweep
    pub status_interval: Duration,
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            base_range: 100,
            range_increment: 50,
            widen_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(60),
            rematch_timeout: Duration::from_secs(30),
            status_interval: Duration::from_secs(5),
        }
    }
}

impl MatchmakingSettings {
    /// Largest rating gap accepted after waiting `waited`
    pub fn acceptance_range(&self, waited: Duration) -> u32 {
        let steps = if self.widen_interval.is_zero() {
            0
        } else {
            waited.as_millis() / self.widen_interval.as_millis()
        };
        let steps = u32::try_from(steps).unwrap_or(u32::MAX);
        self.base_range
            .saturating_add(steps.saturating_mul(self.range_increment))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-wide matchmaking service. Cloning shares the same state.
#[derive(Clone)]
pub struct MatchmakingQueue {
    settings: MatchmakingSettings,
    waiting: Arc<Mutex<WaitingQueue>>,
    rematches: Arc<Mutex<RematchBook>>,
    wait_timers: Timeouts<ParticipantId>,
    rematch_timers: Timeouts<GameId>,
}

impl MatchmakingQueue {
    pub fn new(settings: MatchmakingSettings) -> Self {
        Self {
            settings,
            waiting: Arc::new(Mutex::new(WaitingQueue::new())),
            rematches: Arc::new(Mutex::new(RematchBook::new())),
            wait_timers: Timeouts::new(),
            rematch_timers: Timeouts::new(),
        }
    }

    pub fn settings(&self) -> &MatchmakingSettings {
        &self.settings
    }

    /// Add or refresh `participant`'s entry and (re)arm its wait timeout.
    ///
    /// `on_timeout` receives the evicted entry if the participant is still
    /// waiting after `max_wait`. Returns true if an existing entry was
    /// replaced.
    pub fn enqueue<F>(
        &self,
        participant: Participant,
        rating: i32,
        preference: SidePreference,
        on_timeout: F,
    ) -> bool
    where
        F: FnOnce(QueueEntry) + Send + 'static,
    {
        let entry = QueueEntry {
            participant,
            rating,
            enqueued_at: Instant::now(),
            preference,
        };
        let id = entry.id().clone();
        let enqueued_at = entry.enqueued_at;
        let replaced = lock(&self.waiting).enqueue(entry);
        info!(participant = %id, rating, replaced, "joined matchmaking queue");
        self.arm_wait_timer(id, enqueued_at, on_timeout);
        replaced
    }

    /// Put back an entry taken by [`find_match`](Self::find_match) whose game
    /// could not start. It keeps its place and the time already waited.
    pub fn restore<F>(&self, entry: QueueEntry, on_timeout: F)
    where
        F: FnOnce(QueueEntry) + Send + 'static,
    {
        let id = entry.id().clone();
        let enqueued_at = entry.enqueued_at;
        if !lock(&self.waiting).reinstate(entry) {
            return;
        }
        info!(participant = %id, "returned to matchmaking queue");
        self.arm_wait_timer(id, enqueued_at, on_timeout);
    }

    fn arm_wait_timer<F>(&self, id: ParticipantId, enqueued_at: Instant, on_timeout: F)
    where
        F: FnOnce(QueueEntry) + Send + 'static,
    {
        let delay = self
            .settings
            .max_wait
            .saturating_sub(Instant::now().saturating_duration_since(enqueued_at));
        let waiting = self.waiting.clone();
        let evicted = id.clone();
        self.wait_timers.schedule(id, delay, move || {
            let removed = {
                let mut waiting = lock(&waiting);
                let same_entry = waiting
                    .entries()
                    .iter()
                    .any(|e| e.id() == &evicted && e.enqueued_at == enqueued_at);
                same_entry.then(|| waiting.remove(&evicted)).flatten()
            };
            if let Some(entry) = removed {
                info!(participant = %evicted, "matchmaking wait timed out");
                on_timeout(entry);
            }
        });
    }

    /// Withdraw `participant`; a no-op if absent
    pub fn dequeue(&self, participant: &ParticipantId) -> Option<QueueEntry> {
        self.wait_timers.cancel(participant);
        let removed = lock(&self.waiting).remove(participant);
        if removed.is_some() {
            info!(%participant, "left matchmaking queue");
        }
        removed
    }

    /// Remove and return the next compatible pair, disarming their timers
    pub fn find_match(&self) -> Option<Pairing> {
        let pairing = lock(&self.waiting).find_match(Instant::now(), &self.settings)?;
        self.wait_timers.cancel(pairing.white.id());
        self.wait_timers.cancel(pairing.black.id());
        info!(
            white = %pairing.white.id(),
            black = %pairing.black.id(),
            gap = (pairing.white.rating - pairing.black.rating).abs(),
            "matched"
        );
        Some(pairing)
    }

    pub fn status(&self, participant: &ParticipantId) -> Option<QueueStatus> {
        lock(&self.waiting).status(participant, Instant::now(), &self.settings)
    }

    /// Status of every waiting participant, oldest first
    pub fn statuses(&self) -> Vec<(ParticipantId, QueueStatus)> {
        let now = Instant::now();
        let waiting = lock(&self.waiting);
        waiting
            .entries()
            .iter()
            .filter_map(|entry| {
                waiting
                    .status(entry.id(), now, &self.settings)
                    .map(|status| (entry.id().clone(), status))
            })
            .collect()
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        lock(&self.waiting).contains(participant)
    }

    /// Whether `participant` has an armed wait timeout
    pub fn has_wait_timer(&self, participant: &ParticipantId) -> bool {
        self.wait_timers.is_scheduled(participant)
    }

    pub fn len(&self) -> usize {
        lock(&self.waiting).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a rematch offer for a finished game. It is withdrawn after
    /// `rematch_timeout`, handing the proposal to `on_timeout`.
    pub fn propose_rematch<F>(&self, game_id: GameId, proposer: ParticipantId, on_timeout: F) -> GameResult<()>
    where
        F: FnOnce(RematchProposal) + Send + 'static,
    {
        lock(&self.rematches).propose(game_id, proposer.clone(), Instant::now())?;
        info!(game = %game_id, %proposer, "rematch proposed");

        let rematches = self.rematches.clone();
        self.rematch_timers
            .schedule(game_id, self.settings.rematch_timeout, move || {
                let expired = lock(&rematches).reject(game_id);
                if let Some(proposal) = expired {
                    info!(game = %game_id, "rematch proposal expired");
                    on_timeout(proposal);
                }
            });
        Ok(())
    }

    pub fn accept_rematch(&self, game_id: GameId, accepter: &ParticipantId) -> GameResult<RematchProposal> {
        let proposal = lock(&self.rematches).accept(game_id, accepter)?;
        self.rematch_timers.cancel(&game_id);
        info!(game = %game_id, %accepter, "rematch accepted");
        Ok(proposal)
    }

    /// Withdraw the proposal for `game_id`; a no-op if there is none
    pub fn reject_rematch(&self, game_id: GameId) -> Option<RematchProposal> {
        self.rematch_timers.cancel(&game_id);
        let removed = lock(&self.rematches).reject(game_id);
        if removed.is_some() {
            info!(game = %game_id, "rematch rejected");
        }
        removed
    }

    pub fn rematch_proposal(&self, game_id: GameId) -> Option<RematchProposal> {
        lock(&self.rematches).get(game_id).cloned()
    }
}
