pub mod database;
pub mod errors;
pub mod games;
pub mod models;
pub mod players;
pub mod schema;
mod store;

// Re-export key types for easy access
pub use database::Database;
pub use errors::StorageError;
pub use models::{StoredGame, StoredResult};

// Re-export commonly used functions
pub use database::get_database_path;
