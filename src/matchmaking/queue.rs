use super::MatchmakingSettings;
use crate::chess::Side;
use crate::game::{random_side, Participant, ParticipantId, SidePreference};
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

/// A participant waiting to be paired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub participant: Participant,
    pub rating: i32,
    pub enqueued_at: Instant,
    pub preference: SidePreference,
}

impl QueueEntry {
    pub fn id(&self) -> &ParticipantId {
        &self.participant.id
    }

    pub fn waited(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.enqueued_at)
    }
}

/// Two entries removed from the queue, sides decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub white: QueueEntry,
    pub black: QueueEntry,
}

/// Position report pushed to a waiting participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// 1-based, oldest entry first
    pub position: usize,
    pub waited_secs: u64,
    pub estimated_wait_secs: u64,
    pub acceptance_range: u32,
    pub players_in_queue: usize,
}

/// Sides for two entries given their preferences, in `(first, second)` order.
///
/// Same preference or none at all: coin flip. Different preferences: both
/// honored. One preference: granted, the other entry gets the opposite side.
pub fn reconcile_sides(first: SidePreference, second: SidePreference) -> (Side, Side) {
    let first_side = match (first.side(), second.side()) {
        (Some(a), Some(b)) if a != b => a,
        (Some(_), Some(_)) | (None, None) => random_side(),
        (Some(a), None) => a,
        (None, Some(b)) => b.opposite(),
    };
    (first_side, first_side.opposite())
}

/// Waiting entries ordered oldest first
#[derive(Debug, Default)]
pub struct WaitingQueue {
    entries: Vec<QueueEntry>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing the participant's previous one. A refreshed
    /// entry moves to the back with its new timestamp. Returns true if an
    /// entry was replaced.
    pub fn enqueue(&mut self, entry: QueueEntry) -> bool {
        let replaced = self.remove(entry.id()).is_some();
        self.entries.push(entry);
        replaced
    }

    /// Insert an entry at its place by age. A participant who queued again
    /// in the meantime keeps the newer entry; returns false then.
    pub fn reinstate(&mut self, entry: QueueEntry) -> bool {
        if self.contains(entry.id()) {
            return false;
        }
        let index = self
            .entries
            .iter()
            .position(|e| e.enqueued_at > entry.enqueued_at)
            .unwrap_or(self.entries.len());
        self.entries.insert(index, entry);
        true
    }

    pub fn remove(&mut self, id: &ParticipantId) -> Option<QueueEntry> {
        let index = self.entries.iter().position(|e| e.id() == id)?;
        Some(self.entries.remove(index))
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.entries.iter().any(|e| e.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Pair the oldest entry that has a compatible partner.
    ///
    /// Entries are scanned oldest first; the range applied is the one earned
    /// by the older entry of each candidate pair. Both entries are removed.
    pub fn find_match(&mut self, now: Instant, settings: &MatchmakingSettings) -> Option<Pairing> {
        let (i, j) = self.entries.iter().enumerate().find_map(|(i, older)| {
            let range = i64::from(settings.acceptance_range(older.waited(now)));
            self.entries
                .iter()
                .enumerate()
                .skip(i + 1)
                .find(|(_, newer)| (i64::from(older.rating) - i64::from(newer.rating)).abs() <= range)
                .map(|(j, _)| (i, j))
        })?;

        // j > i, so removing j first keeps i valid
        let newer = self.entries.remove(j);
        let older = self.entries.remove(i);
        let (older_side, _) = reconcile_sides(older.preference, newer.preference);
        Some(match older_side {
            Side::White => Pairing {
                white: older,
                black: newer,
            },
            Side::Black => Pairing {
                white: newer,
                black: older,
            },
        })
    }

    pub fn status(
        &self,
        id: &ParticipantId,
        now: Instant,
        settings: &MatchmakingSettings,
    ) -> Option<QueueStatus> {
        let index = self.entries.iter().position(|e| e.id() == id)?;
        let waited = self.entries[index].waited(now);
        let position = index + 1;
        Some(QueueStatus {
            position,
            waited_secs: waited.as_secs(),
            estimated_wait_secs: (waited.as_secs() + position as u64 * 5).max(10),
            acceptance_range: settings.acceptance_range(waited),
            players_in_queue: self.entries.len(),
        })
    }
}
