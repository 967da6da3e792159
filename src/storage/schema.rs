use crate::storage::errors::{Result, StorageError};
use rusqlite::Connection;

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Migration represents a single database migration
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All database migrations in order
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema with players and games tables",
    sql: r#"
            -- Registered participants and their ratings
            CREATE TABLE players (
                identity TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                rating INTEGER NOT NULL CHECK(rating >= 0),
                connected INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL
            );

            -- Finished rated games; for a win, first_player is the winner
            CREATE TABLE games (
                id TEXT PRIMARY KEY,
                first_player TEXT NOT NULL,
                second_player TEXT NOT NULL,
                result TEXT NOT NULL CHECK(result IN ('win', 'draw')),
                moves TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (first_player) REFERENCES players(identity),
                FOREIGN KEY (second_player) REFERENCES players(identity)
            );

            -- Schema migrations tracking table
            CREATE TABLE schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL,
                description TEXT NOT NULL
            );

            CREATE INDEX idx_players_rating ON players(rating DESC);
            CREATE INDEX idx_players_connected ON players(connected);
            CREATE INDEX idx_games_first ON games(first_player);
            CREATE INDEX idx_games_second ON games(second_player);
            CREATE INDEX idx_games_created ON games(created_at DESC);
        "#,
}];

/// Create the schema on a fresh database or apply pending migrations
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(|e| {
            StorageError::migration_failed(0, format!("Failed to enable foreign keys: {}", e))
        })?;

    let current_version = get_current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.unchecked_transaction().map_err(|e| {
        StorageError::migration_failed(-1, format!("Failed to start transaction: {}", e))
    })?;
    for migration in pending {
        execute_migration(&tx, migration)?;
    }
    tx.commit().map_err(|e| {
        StorageError::migration_failed(-1, format!("Failed to commit migrations: {}", e))
    })?;

    Ok(())
}

fn execute_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute_batch(migration.sql).map_err(|e| {
        StorageError::migration_failed(
            migration.version,
            format!("Failed to execute migration {}: {}", migration.version, e),
        )
    })?;

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?1, ?2, ?3)",
        (
            migration.version,
            crate::storage::Database::current_timestamp(),
            migration.description,
        ),
    )
    .map_err(|e| {
        StorageError::migration_failed(
            migration.version,
            format!("Failed to record migration {}: {}", migration.version, e),
        )
    })?;

    Ok(())
}

/// Highest applied migration, 0 on a fresh database
pub fn get_current_version(conn: &Connection) -> Result<i32> {
    let tracked = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name='schema_migrations'")
        .and_then(|mut stmt| stmt.exists([]))?;
    if !tracked {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .map_err(|e| {
            StorageError::migration_failed(-1, format!("Failed to get current version: {}", e))
        })?
        .unwrap_or(0);

    Ok(version)
}
