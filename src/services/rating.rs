use crate::chess::MoveRecord;
use crate::game::{GameId, ParticipantId};
use crate::storage::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingSettings {
    pub k_factor: i32,
    /// Rating of a participant the store has never seen
    pub default_rating: i32,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            k_factor: 24,
            default_rating: 1200,
        }
    }
}

/// Probability-like score `rating` is expected to take against `opponent`
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - rating) / 400.0))
}

fn adjusted(rating: i32, opponent: i32, actual: f64, k_factor: i32) -> i32 {
    let delta = f64::from(k_factor) * (actual - expected_score(rating, opponent));
    rating + delta.round() as i32
}

/// New `(winner, loser)` ratings after a decisive game; the loser never
/// drops below zero
pub fn updated_ratings(winner: i32, loser: i32, k_factor: i32) -> (i32, i32) {
    (
        adjusted(winner, loser, 1.0, k_factor),
        adjusted(loser, winner, 0.0, k_factor).max(0),
    )
}

/// New ratings of both players after a draw
pub fn drawn_ratings(a: i32, b: i32, k_factor: i32) -> (i32, i32) {
    (adjusted(a, b, 0.5, k_factor), adjusted(b, a, 0.5, k_factor))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRating {
    pub identity: ParticipantId,
    pub display_name: String,
    pub rating: i32,
}

/// Ratings and finished games of registered participants.
///
/// Calls may block on I/O; the coordinator runs them on the blocking pool.
pub trait RatingStore: Send + Sync {
    fn get_rating(&self, identity: &ParticipantId) -> Result<i32>;

    /// Store a decisive game and update both ratings
    fn record_result(
        &self,
        game_id: GameId,
        winner: &ParticipantId,
        loser: &ParticipantId,
        moves: &[MoveRecord],
    ) -> Result<()>;

    fn record_draw(
        &self,
        game_id: GameId,
        first: &ParticipantId,
        second: &ParticipantId,
        moves: &[MoveRecord],
    ) -> Result<()>;

    fn set_connected(&self, identity: &ParticipantId, display_name: &str, connected: bool) -> Result<()>;

    fn list_connected(&self) -> Result<Vec<PlayerRating>>;
}

#[derive(Debug, Clone)]
struct MemoryPlayer {
    display_name: String,
    rating: i32,
    connected: bool,
}

/// A recorded game, as kept by [`MemoryRatingStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedGame {
    pub game_id: GameId,
    pub players: (ParticipantId, ParticipantId),
    pub drawn: bool,
    pub moves: usize,
}

/// In-process store used when no database is configured
#[derive(Debug, Default)]
pub struct MemoryRatingStore {
    settings: RatingSettings,
    players: Mutex<HashMap<ParticipantId, MemoryPlayer>>,
    games: Mutex<Vec<RecordedGame>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryRatingStore {
    pub fn new(settings: RatingSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Seed a participant's rating
    pub fn set_rating(&self, identity: &ParticipantId, rating: i32) {
        lock(&self.players)
            .entry(identity.clone())
            .or_insert_with(|| MemoryPlayer {
                display_name: identity.to_string(),
                rating,
                connected: false,
            })
            .rating = rating;
    }

    pub fn games(&self) -> Vec<RecordedGame> {
        lock(&self.games).clone()
    }

    fn rating_of(&self, players: &HashMap<ParticipantId, MemoryPlayer>, id: &ParticipantId) -> i32 {
        players
            .get(id)
            .map_or(self.settings.default_rating, |p| p.rating)
    }

    fn store_ratings(&self, updates: [(&ParticipantId, i32); 2]) {
        let mut players = lock(&self.players);
        for (id, rating) in updates {
            players
                .entry(id.clone())
                .or_insert_with(|| MemoryPlayer {
                    display_name: id.to_string(),
                    rating,
                    connected: false,
                })
                .rating = rating;
        }
    }
}

impl RatingStore for MemoryRatingStore {
    fn get_rating(&self, identity: &ParticipantId) -> Result<i32> {
        Ok(self.rating_of(&lock(&self.players), identity))
    }

    fn record_result(
        &self,
        game_id: GameId,
        winner: &ParticipantId,
        loser: &ParticipantId,
        moves: &[MoveRecord],
    ) -> Result<()> {
        let (w, l) = {
            let players = lock(&self.players);
            updated_ratings(
                self.rating_of(&players, winner),
                self.rating_of(&players, loser),
                self.settings.k_factor,
            )
        };
        self.store_ratings([(winner, w), (loser, l)]);
        lock(&self.games).push(RecordedGame {
            game_id,
            players: (winner.clone(), loser.clone()),
            drawn: false,
            moves: moves.len(),
        });
        Ok(())
    }

    fn record_draw(
        &self,
        game_id: GameId,
        first: &ParticipantId,
        second: &ParticipantId,
        moves: &[MoveRecord],
    ) -> Result<()> {
        let (a, b) = {
            let players = lock(&self.players);
            drawn_ratings(
                self.rating_of(&players, first),
                self.rating_of(&players, second),
                self.settings.k_factor,
            )
        };
        self.store_ratings([(first, a), (second, b)]);
        lock(&self.games).push(RecordedGame {
            game_id,
            players: (first.clone(), second.clone()),
            drawn: true,
            moves: moves.len(),
        });
        Ok(())
    }

    fn set_connected(&self, identity: &ParticipantId, display_name: &str, connected: bool) -> Result<()> {
        let default_rating = self.settings.default_rating;
        let mut players = lock(&self.players);
        let player = players
            .entry(identity.clone())
            .or_insert_with(|| MemoryPlayer {
                display_name: display_name.to_string(),
                rating: default_rating,
                connected,
            });
        player.display_name = display_name.to_string();
        player.connected = connected;
        Ok(())
    }

    fn list_connected(&self) -> Result<Vec<PlayerRating>> {
        let mut connected: Vec<PlayerRating> = lock(&self.players)
            .iter()
            .filter(|(_, p)| p.connected)
            .map(|(id, p)| PlayerRating {
                identity: id.clone(),
                display_name: p.display_name.clone(),
                rating: p.rating,
            })
            .collect();
        connected.sort_by(|a, b| b.rating.cmp(&a.rating).then_with(|| a.identity.cmp(&b.identity)));
        Ok(connected)
    }
}
