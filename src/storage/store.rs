use crate::chess::MoveRecord;
use crate::game::{GameId, ParticipantId};
use crate::services::rating::{drawn_ratings, updated_ratings, PlayerRating, RatingStore};
use crate::storage::database::Database;
use crate::storage::errors::Result;
use crate::storage::games::insert_game;
use crate::storage::models::StoredResult;
use crate::storage::players::{ensure_player, stored_rating, update_rating};
use tracing::info;

impl Database {
    /// Store a finished game and both new ratings in one transaction
    fn record(
        &self,
        game_id: GameId,
        first: &ParticipantId,
        second: &ParticipantId,
        result: StoredResult,
        moves: &[MoveRecord],
    ) -> Result<(i32, i32)> {
        let settings = self.rating_settings();
        self.with_transaction(|conn| {
            for identity in [first, second] {
                ensure_player(conn, identity, identity.as_str(), settings.default_rating)?;
            }
            let a = stored_rating(conn, first)?.unwrap_or(settings.default_rating);
            let b = stored_rating(conn, second)?.unwrap_or(settings.default_rating);
            let (a, b) = match result {
                StoredResult::Win => updated_ratings(a, b, settings.k_factor),
                StoredResult::Draw => drawn_ratings(a, b, settings.k_factor),
            };
            update_rating(conn, first, a)?;
            update_rating(conn, second, b)?;
            insert_game(conn, game_id, first, second, result, moves)?;
            Ok((a, b))
        })
    }
}

impl RatingStore for Database {
    fn get_rating(&self, identity: &ParticipantId) -> Result<i32> {
        let default_rating = self.rating_settings().default_rating;
        self.with_connection(|conn| Ok(stored_rating(conn, identity)?.unwrap_or(default_rating)))
    }

    fn record_result(
        &self,
        game_id: GameId,
        winner: &ParticipantId,
        loser: &ParticipantId,
        moves: &[MoveRecord],
    ) -> Result<()> {
        let (w, l) = self.record(game_id, winner, loser, StoredResult::Win, moves)?;
        info!(game = %game_id, %winner, winner_rating = w, %loser, loser_rating = l, "recorded result");
        Ok(())
    }

    fn record_draw(
        &self,
        game_id: GameId,
        first: &ParticipantId,
        second: &ParticipantId,
        moves: &[MoveRecord],
    ) -> Result<()> {
        let (a, b) = self.record(game_id, first, second, StoredResult::Draw, moves)?;
        info!(game = %game_id, %first, first_rating = a, %second, second_rating = b, "recorded draw");
        Ok(())
    }

    fn set_connected(&self, identity: &ParticipantId, display_name: &str, connected: bool) -> Result<()> {
        self.mark_connected(identity, display_name, connected)
    }

    fn list_connected(&self) -> Result<Vec<PlayerRating>> {
        self.connected_players()
    }
}
