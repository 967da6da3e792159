use crate::game::ParticipantId;
use crate::services::PlayerRating;
use crate::storage::database::Database;
use crate::storage::errors::{Result, StorageError};
use rusqlite::{named_params, Connection, OptionalExtension, Row};

/// Rating stored for `identity`, if the player is known
pub(crate) fn stored_rating(conn: &Connection, identity: &ParticipantId) -> Result<Option<i32>> {
    Ok(conn
        .query_row(
            "SELECT rating FROM players WHERE identity = ?1",
            [identity.as_str()],
            |row| row.get(0),
        )
        .optional()?)
}

/// Insert the player if missing; never touches an existing rating
pub(crate) fn ensure_player(
    conn: &Connection,
    identity: &ParticipantId,
    display_name: &str,
    rating: i32,
) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO players (identity, display_name, rating, connected, updated_at)
        VALUES (:identity, :display_name, :rating, 0, :now)
        ON CONFLICT(identity) DO NOTHING
        "#,
        named_params! {
            ":identity": identity.as_str(),
            ":display_name": display_name,
            ":rating": rating,
            ":now": Database::current_timestamp(),
        },
    )?;
    Ok(())
}

pub(crate) fn update_rating(conn: &Connection, identity: &ParticipantId, rating: i32) -> Result<()> {
    let rows_affected = conn.execute(
        "UPDATE players SET rating = ?1, updated_at = ?2 WHERE identity = ?3",
        (rating, Database::current_timestamp(), identity.as_str()),
    )?;
    if rows_affected == 0 {
        return Err(StorageError::player_not_found(identity.as_str()));
    }
    Ok(())
}

fn player_from_row(row: &Row) -> rusqlite::Result<PlayerRating> {
    Ok(PlayerRating {
        identity: ParticipantId::new(row.get::<_, String>("identity")?),
        display_name: row.get("display_name")?,
        rating: row.get("rating")?,
    })
}

impl Database {
    /// Get a player by identity
    pub fn get_player(&self, identity: &ParticipantId) -> Result<PlayerRating> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT identity, display_name, rating FROM players WHERE identity = ?1",
                [identity.as_str()],
                player_from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StorageError::player_not_found(identity.as_str())
                }
                _ => StorageError::ConnectionFailed(e),
            })
        })
    }

    /// Highest rated players first
    pub fn leaderboard(&self, limit: u32) -> Result<Vec<PlayerRating>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT identity, display_name, rating
                FROM players
                ORDER BY rating DESC, identity ASC
                LIMIT ?1
                "#,
            )?;
            let players = stmt
                .query_map([limit], player_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(players)
        })
    }

    pub(crate) fn connected_players(&self) -> Result<Vec<PlayerRating>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT identity, display_name, rating
                FROM players
                WHERE connected = 1
                ORDER BY rating DESC, identity ASC
                "#,
            )?;
            let players = stmt
                .query_map([], player_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(players)
        })
    }

    pub(crate) fn mark_connected(
        &self,
        identity: &ParticipantId,
        display_name: &str,
        connected: bool,
    ) -> Result<()> {
        let default_rating = self.rating_settings().default_rating;
        self.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO players (identity, display_name, rating, connected, updated_at)
                VALUES (:identity, :display_name, :rating, :connected, :now)
                ON CONFLICT(identity) DO UPDATE SET
                    display_name = excluded.display_name,
                    connected = excluded.connected,
                    updated_at = excluded.updated_at
                "#,
                named_params! {
                    ":identity": identity.as_str(),
                    ":display_name": display_name,
                    ":rating": default_rating,
                    ":connected": connected,
                    ":now": Database::current_timestamp(),
                },
            )?;
            Ok(())
        })
    }
}
