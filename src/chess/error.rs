use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    InvalidSide(String),
    InvalidPiece(String),
    InvalidCell(String),
    /// The piece does not exist on the mover's side
    UnknownPiece(String),
    /// Per-kind movement rules reject the relocation
    IllegalMove(String),
    /// The mover was in check and the move does not resolve it
    StillInCheck,
    /// The move would leave the mover's own king attacked
    ExposesKing,
}

impl ChessError {
    /// Whether the error stems from malformed notation rather than a rule rejection
    pub fn is_notation(&self) -> bool {
        matches!(
            self,
            ChessError::InvalidSide(_) | ChessError::InvalidPiece(_) | ChessError::InvalidCell(_)
        )
    }
}

impl fmt::Display for ChessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChessError::InvalidSide(msg) => write!(f, "Invalid side: {}", msg),
            ChessError::InvalidPiece(msg) => write!(f, "Invalid piece: {}", msg),
            ChessError::InvalidCell(msg) => write!(f, "Invalid cell: {}", msg),
            ChessError::UnknownPiece(piece) => write!(f, "illegal move: no piece {}", piece),
            ChessError::IllegalMove(msg) => write!(f, "illegal move: {}", msg),
            ChessError::StillInCheck => write!(f, "still in check"),
            ChessError::ExposesKing => write!(f, "exposes own king"),
        }
    }
}

impl std::error::Error for ChessError {}
