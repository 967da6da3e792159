pub mod chess;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod game;
pub mod matchmaking;
pub mod services;
pub mod storage;

// Re-export key types for easy testing
pub use chess::{Board, Engine, MoveRecord, Side};
pub use config::Config;
pub use coordinator::{CoordinatorSettings, GameCoordinator, QueueOutcome};
pub use game::{GameError, GameId, GameSession, ParticipantId};
pub use matchmaking::{MatchmakingQueue, MatchmakingSettings};
pub use storage::Database;
