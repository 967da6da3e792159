use crate::chess::MoveRecord;
use crate::game::{GameId, ParticipantId};
use crate::storage::database::Database;
use crate::storage::errors::{Result, StorageError};
use crate::storage::models::{StoredGame, StoredResult};
use rusqlite::{named_params, Connection, Row};

pub(crate) fn insert_game(
    conn: &Connection,
    game_id: GameId,
    first: &ParticipantId,
    second: &ParticipantId,
    result: StoredResult,
    moves: &[MoveRecord],
) -> Result<()> {
    // Serialize moves outside the named_params! macro
    let serialized_moves = serde_json::to_string(moves)
        .map_err(|e| StorageError::serialization_error("game moves", e))?;

    conn.execute(
        r#"
        INSERT INTO games (id, first_player, second_player, result, moves, created_at)
        VALUES (:id, :first_player, :second_player, :result, :moves, :created_at)
        "#,
        named_params! {
            ":id": game_id.to_string(),
            ":first_player": first.as_str(),
            ":second_player": second.as_str(),
            ":result": result.as_str(),
            ":moves": serialized_moves,
            ":created_at": Database::current_timestamp(),
        },
    )?;
    Ok(())
}

impl Database {
    /// Get recent games (limited count)
    pub fn recent_games(&self, limit: u32) -> Result<Vec<StoredGame>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, first_player, second_player, result, moves, created_at
                FROM games
                ORDER BY created_at DESC, rowid DESC
                LIMIT ?1
                "#,
            )?;
            let games = stmt
                .query_map([limit], game_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(games)
        })
    }

    /// Games `identity` took part in, newest first
    pub fn games_for(&self, identity: &ParticipantId) -> Result<Vec<StoredGame>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, first_player, second_player, result, moves, created_at
                FROM games
                WHERE first_player = ?1 OR second_player = ?1
                ORDER BY created_at DESC, rowid DESC
                "#,
            )?;
            let games = stmt
                .query_map([identity.as_str()], game_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(games)
        })
    }
}

/// Convert a database row to a StoredGame
fn game_from_row(row: &Row) -> rusqlite::Result<StoredGame> {
    let moves_str: String = row.get("moves")?;
    let moves = serde_json::from_str(&moves_str).map_err(|_e| {
        rusqlite::Error::InvalidColumnType(4, "moves".to_string(), rusqlite::types::Type::Text)
    })?;

    let result_str: String = row.get("result")?;
    let result = result_str.parse::<StoredResult>().map_err(|_e| {
        rusqlite::Error::InvalidColumnType(3, "result".to_string(), rusqlite::types::Type::Text)
    })?;

    Ok(StoredGame {
        id: row.get("id")?,
        first_player: ParticipantId::new(row.get::<_, String>("first_player")?),
        second_player: ParticipantId::new(row.get::<_, String>("second_player")?),
        result,
        moves,
        created_at: row.get("created_at")?,
    })
}
