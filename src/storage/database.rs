use crate::services::RatingSettings;
use crate::storage::errors::{Result, StorageError};
use crate::storage::schema;
use directories::ProjectDirs;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// SQLite-backed player and game store.
///
/// The connection sits behind a mutex; cloning shares it.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    settings: RatingSettings,
}

impl Database {
    /// Open (creating if needed) the database at `path` and migrate it
    pub fn open(path: impl AsRef<Path>, settings: RatingSettings) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::database_path_error(format!(
                    "Failed to create database directory: {}",
                    e
                ))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        debug!(path = %path.display(), "opened database");
        Self::from_connection(conn, settings)
    }

    /// A private in-memory database, for tests and ephemeral servers
    pub fn open_in_memory(settings: RatingSettings) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, settings)
    }

    fn from_connection(conn: Connection, settings: RatingSettings) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            settings,
        })
    }

    pub fn rating_settings(&self) -> RatingSettings {
        self.settings
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Execute a closure with access to the connection
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        f(&self.lock())
    }

    /// Execute a transaction with automatic rollback on error
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock();
        let tx = conn.unchecked_transaction()?;
        match f(&tx) {
            Ok(result) => {
                tx.commit()?;
                Ok(result)
            }
            Err(e) => {
                let _ = tx.rollback(); // Ignore rollback errors, return original error
                Err(e)
            }
        }
    }

    pub fn schema_version(&self) -> Result<i32> {
        self.with_connection(schema::get_current_version)
    }

    /// Get current Unix timestamp
    pub fn current_timestamp() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}

/// Default database location for the current platform
pub fn get_database_path() -> Result<PathBuf> {
    // Check for test override environment variable first
    if let Ok(custom_data_dir) = std::env::var("MATE_ARENA_DATA_DIR") {
        return Ok(PathBuf::from(custom_data_dir).join("arena.sqlite"));
    }

    let project_dirs = ProjectDirs::from("dev", "mate", "mate-arena").ok_or_else(|| {
        StorageError::database_path_error("Failed to determine application data directory")
    })?;

    Ok(project_dirs.data_dir().join("arena.sqlite"))
}
