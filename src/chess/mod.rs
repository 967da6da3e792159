// Re-export all public items
pub use self::board::{Board, BoardSnapshot, Pieces};
pub use self::cell::Cell;
pub use self::engine::{Engine, TurnState};
pub use self::error::ChessError;
pub use self::moves::{Capture, CheckRecord, MateRecord, MoveEffect, MoveRecord, MoveRequest};
pub use self::piece::{PieceId, PieceKind, Side};
pub use self::validator::ThreatCache;

// Define submodules
mod board;
mod cell;
mod engine;
mod error;
mod moves;
mod piece;
pub mod validator;
