use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] rusqlite::Error),

    #[error("Migration {version} failed: {message}")]
    MigrationFailed { version: i32, message: String },

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Serialization error in {context}: {source}")]
    SerializationError {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database path error: {0}")]
    DatabasePathError(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl StorageError {
    pub fn migration_failed(version: i32, message: impl Into<String>) -> Self {
        StorageError::MigrationFailed {
            version,
            message: message.into(),
        }
    }

    pub fn serialization_error(context: impl Into<String>, source: serde_json::Error) -> Self {
        StorageError::SerializationError {
            context: context.into(),
            source,
        }
    }

    pub fn database_path_error(message: impl Into<String>) -> Self {
        StorageError::DatabasePathError(message.into())
    }

    pub fn player_not_found(identity: impl Into<String>) -> Self {
        StorageError::PlayerNotFound(identity.into())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
