use super::validator::{self, ThreatCache};
use super::{
    Board, BoardSnapshot, Capture, Cell, CheckRecord, ChessError, MateRecord, MoveEffect,
    MoveRecord, PieceId, Side,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Side to move plus the check standing against it, if any.
///
/// A check record always names the side to move: it is replaced or cleared
/// on every committed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    pub to_move: Side,
    pub check: Option<CheckRecord>,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            to_move: Side::White,
            check: None,
        }
    }
}

/// Board, turn and threat bookkeeping for one game.
///
/// `apply` is the only way to change the position; a rejected move leaves
/// the engine untouched.
#[derive(Debug, Clone)]
pub struct Engine {
    board: Board,
    turn: TurnState,
    threats: ThreatCache,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Standard starting position, White to move
    pub fn new() -> Self {
        Self::from_position(Board::new(), Side::White)
    }

    /// Start from an arbitrary position. A king of `to_move` that is already
    /// attacked is recorded as being in check.
    pub fn from_position(board: Board, to_move: Side) -> Self {
        let threats = ThreatCache::compute(&board);
        let check = threats
            .checking(to_move.opposite())
            .iter()
            .next()
            .map(|by| CheckRecord {
                side: to_move,
                by: *by,
            });
        Self {
            board,
            turn: TurnState { to_move, check },
            threats,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> TurnState {
        self.turn
    }

    pub fn to_move(&self) -> Side {
        self.turn.to_move
    }

    pub fn threats(&self) -> &ThreatCache {
        &self.threats
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.board.snapshot(self.turn.to_move)
    }

    pub fn legal_moves(&self) -> Vec<(PieceId, Cell)> {
        validator::legal_moves(&self.board, self.turn.to_move)
    }

    /// Validate and commit a move for `side`, returning its log record
    pub fn apply(&mut self, side: Side, piece: PieceId, to: Cell) -> Result<MoveRecord, ChessError> {
        if side != self.turn.to_move {
            return Err(ChessError::IllegalMove(format!(
                "it is {}'s turn",
                self.turn.to_move
            )));
        }
        let from = self
            .board
            .cell_of(side, piece)
            .ok_or_else(|| ChessError::UnknownPiece(piece.to_string()))?;
        let in_check = self.turn.check.is_some_and(|check| check.side == side);

        let next = validator::validate_move(&self.board, side, piece, to, in_check)?;
        let capture = self
            .board
            .piece_at(side.opposite(), to)
            .map(|captured| Capture {
                side: side.opposite(),
                piece: captured,
                cell: to,
            });

        self.board = next;
        self.threats.refresh(&self.board);

        let checking = self.threats.checking(side);
        let check = if checking.contains(&piece) {
            Some(piece)
        } else {
            checking.iter().next().copied()
        }
        .map(|by| CheckRecord {
            side: side.opposite(),
            by,
        });
        let mate = check
            .filter(|check| validator::is_checkmate(&self.board, check, &self.threats))
            .map(|check| MateRecord {
                side: check.side,
                by: check.by,
            });

        self.turn = TurnState {
            to_move: side.opposite(),
            check,
        };

        let record = MoveRecord {
            side,
            piece,
            from,
            to,
            effect: MoveEffect {
                capture,
                check,
                mate,
            },
        };
        debug!(%record, "move committed");
        Ok(record)
    }
}
