use crate::chess::ChessError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Unknown game, participant or proposal
    #[error("Not found: {0}")]
    NotFound(String),

    /// Illegal move, wrong turn, duplicate join/offer/proposal or inactive session
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed input rejected at the boundary
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl GameError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        GameError::NotFound(what.to_string())
    }

    pub fn conflict(what: impl std::fmt::Display) -> Self {
        GameError::Conflict(what.to_string())
    }
}

impl From<ChessError> for GameError {
    fn from(err: ChessError) -> Self {
        if err.is_notation() {
            GameError::Validation(err.to_string())
        } else {
            GameError::Conflict(err.to_string())
        }
    }
}

pub type GameResult<T> = std::result::Result<T, GameError>;
