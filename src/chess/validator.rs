//! Move legality, check and checkmate over a [`Board`].
//!
//! Everything here is pure with respect to the board passed in: simulations
//! run on scratch copies and the caller decides what to commit.

use super::{Board, Cell, CheckRecord, ChessError, PieceId, PieceKind, Side};
use std::collections::BTreeSet;
use tracing::trace;

const ORTHOGONAL: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];
const KING_OFFSETS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// True if neither side occupies `cell`.
///
/// Off-grid squares are unrepresentable as [`Cell`]; ray walks stop at the
/// edge via [`Cell::offset`], which is how "outside the grid is never empty"
/// is enforced.
pub fn is_destination_empty(board: &Board, cell: Cell) -> bool {
    !board.is_occupied(cell)
}

/// True if a piece of `side`'s opponent stands on `cell`
pub fn is_occupied_by_opponent(board: &Board, side: Side, cell: Cell) -> bool {
    board.piece_at(side.opposite(), cell).is_some()
}

fn walks_ray(board: &Board, from: Cell, to: Cell, directions: &[(i8, i8)]) -> bool {
    for &(df, dr) in directions {
        let mut current = from;
        while let Some(next) = current.offset(df, dr) {
            if next == to {
                return true;
            }
            if !is_destination_empty(board, next) {
                break;
            }
            current = next;
        }
    }
    false
}

fn leaps(from: Cell, to: Cell, offsets: &[(i8, i8)]) -> bool {
    offsets
        .iter()
        .any(|&(df, dr)| from.offset(df, dr) == Some(to))
}

/// Whether `piece` of `side` bears on `cell`, whatever stands there.
///
/// Pawns bear on their two forward diagonals only. Sliders stop at the first
/// occupied cell of each ray, which they still bear on.
pub fn controls(board: &Board, side: Side, piece: PieceId, cell: Cell) -> bool {
    let Some(from) = board.cell_of(side, piece) else {
        return false;
    };
    if from == cell {
        return false;
    }
    match piece.kind {
        PieceKind::Pawn => {
            from.offset(1, side.forward()) == Some(cell)
                || from.offset(-1, side.forward()) == Some(cell)
        }
        PieceKind::Knight => leaps(from, cell, &KNIGHT_OFFSETS),
        PieceKind::King => leaps(from, cell, &KING_OFFSETS),
        PieceKind::Rook => walks_ray(board, from, cell, &ORTHOGONAL),
        PieceKind::Bishop => walks_ray(board, from, cell, &DIAGONAL),
        PieceKind::Queen => {
            walks_ray(board, from, cell, &ORTHOGONAL) || walks_ray(board, from, cell, &DIAGONAL)
        }
    }
}

fn can_pawn_move(board: &Board, side: Side, from: Cell, to: Cell) -> bool {
    let forward = side.forward();

    if let Some(one_step) = from.offset(0, forward) {
        if one_step == to {
            return is_destination_empty(board, to);
        }
        if from.rank() == side.pawn_rank() && from.offset(0, 2 * forward) == Some(to) {
            return is_destination_empty(board, one_step) && is_destination_empty(board, to);
        }
    }

    let diagonal =
        from.offset(1, forward) == Some(to) || from.offset(-1, forward) == Some(to);
    diagonal && is_occupied_by_opponent(board, side, to)
}

/// Per-kind legality of relocating `piece` of `side` to `to`, ignoring
/// whether the mover's king ends up attacked
pub fn can_reach(board: &Board, side: Side, piece: PieceId, to: Cell) -> bool {
    let Some(from) = board.cell_of(side, piece) else {
        return false;
    };
    if from == to || board.piece_at(side, to).is_some() {
        return false;
    }
    match piece.kind {
        PieceKind::Pawn => can_pawn_move(board, side, from, to),
        _ => controls(board, side, piece, to),
    }
}

/// Opponent pieces with a legal path to `side`'s king
pub fn attackers(board: &Board, side: Side) -> Vec<PieceId> {
    let Some(king) = board.king(side) else {
        return Vec::new();
    };
    let opponent = side.opposite();
    board
        .pieces(opponent)
        .keys()
        .filter(|piece| can_reach(board, opponent, **piece, king))
        .copied()
        .collect()
}

pub fn is_king_attacked(board: &Board, side: Side) -> bool {
    !attackers(board, side).is_empty()
}

/// Validate a move and return the board as it would be after it.
///
/// `in_check` selects the rejection reported when the simulated position
/// leaves the mover's king attacked.
pub fn validate_move(
    board: &Board,
    side: Side,
    piece: PieceId,
    to: Cell,
    in_check: bool,
) -> Result<Board, ChessError> {
    let from = board
        .cell_of(side, piece)
        .ok_or_else(|| ChessError::UnknownPiece(piece.to_string()))?;

    if !can_reach(board, side, piece, to) {
        return Err(ChessError::IllegalMove(format!(
            "{} cannot move from {} to {}",
            piece, from, to
        )));
    }

    let mut scratch = board.clone();
    scratch.relocate(side, piece, to)?;
    if is_king_attacked(&scratch, side) {
        trace!(%piece, %from, %to, in_check, "move leaves king attacked");
        return Err(if in_check {
            ChessError::StillInCheck
        } else {
            ChessError::ExposesKing
        });
    }
    Ok(scratch)
}

/// Whether the move is legal and leaves the mover's king safe
pub fn is_legal(board: &Board, side: Side, piece: PieceId, to: Cell) -> bool {
    validate_move(board, side, piece, to, false).is_ok()
}

/// Check delivered by `side` after it moved `moved`, attributed to the moved
/// piece when it is one of the checkers
pub fn detect_check(board: &Board, side: Side, moved: PieceId) -> Option<CheckRecord> {
    let checkers = attackers(board, side.opposite());
    let by = if checkers.contains(&moved) {
        moved
    } else {
        *checkers.first()?
    };
    Some(CheckRecord {
        side: side.opposite(),
        by,
    })
}

/// Checkmate determination for a side that was just put in check.
///
/// The checked side escapes if its king can step to a safe adjacent cell,
/// if a piece can capture the checker, or, against a sliding checker, if a
/// piece can interpose. Each candidate is confirmed by simulation, so
/// double checks and x-ray attacks through the king's old cell are handled.
pub fn is_checkmate(board: &Board, check: &CheckRecord, threats: &ThreatCache) -> bool {
    let defender = check.side;
    let attacker = defender.opposite();
    let Some(king) = board.king(defender) else {
        return false;
    };

    // Cells already controlled by a piece pressing the king stay attacked
    // once the king moves there, so they are skipped before simulating.
    let pressing = threats.around_king(attacker);
    let king_escapes = king.neighbours().any(|cell| {
        let controlled = pressing
            .iter()
            .any(|piece| controls(board, attacker, *piece, cell));
        !controlled && is_legal(board, defender, PieceId::KING, cell)
    });
    if king_escapes {
        return false;
    }

    let checkers = attackers(board, defender);
    let checker = match checkers.as_slice() {
        [] => return false,
        [single] => *single,
        // Double check: only a king move could help.
        _ => return true,
    };
    let Some(checker_cell) = board.cell_of(attacker, checker) else {
        return false;
    };

    let mut targets = vec![checker_cell];
    if checker.kind.is_slider() {
        targets.extend(checker_cell.between(&king));
    }

    let defenders: Vec<PieceId> = board
        .pieces(defender)
        .keys()
        .filter(|piece| !piece.is_king())
        .copied()
        .collect();
    let can_answer = targets.iter().any(|cell| {
        defenders
            .iter()
            .any(|piece| is_legal(board, defender, *piece, *cell))
    });
    !can_answer
}

/// Every legal move for `side`, as `(piece, destination)` pairs
pub fn legal_moves(board: &Board, side: Side) -> Vec<(PieceId, Cell)> {
    board
        .pieces(side)
        .keys()
        .flat_map(|piece| Cell::all().map(move |cell| (*piece, cell)))
        .filter(|(piece, cell)| is_legal(board, side, *piece, *cell))
        .collect()
}

/// Per-side threat bookkeeping.
///
/// For each side: the pieces with a legal path to the opponent king
/// (`checking`) and the pieces bearing on a cell adjacent to the opponent
/// king (`around_king`). The cache always equals what [`ThreatCache::compute`]
/// yields for the current board; the engine refreshes it on every committed
/// move, captures included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreatCache {
    checking: [BTreeSet<PieceId>; 2],
    around_king: [BTreeSet<PieceId>; 2],
}

fn slot(side: Side) -> usize {
    match side {
        Side::White => 0,
        Side::Black => 1,
    }
}

impl ThreatCache {
    pub fn compute(board: &Board) -> Self {
        let mut cache = Self::default();
        for side in Side::BOTH {
            let Some(enemy_king) = board.king(side.opposite()) else {
                continue;
            };
            let around: Vec<Cell> = enemy_king.neighbours().collect();
            for piece in board.pieces(side).keys() {
                if can_reach(board, side, *piece, enemy_king) {
                    cache.checking[slot(side)].insert(*piece);
                }
                if around.iter().any(|cell| controls(board, side, *piece, *cell)) {
                    cache.around_king[slot(side)].insert(*piece);
                }
            }
        }
        cache
    }

    pub fn refresh(&mut self, board: &Board) {
        *self = Self::compute(board);
    }

    /// `side`'s pieces with a legal path to the opponent king
    pub fn checking(&self, side: Side) -> &BTreeSet<PieceId> {
        &self.checking[slot(side)]
    }

    /// `side`'s pieces bearing on cells adjacent to the opponent king
    pub fn around_king(&self, side: Side) -> &BTreeSet<PieceId> {
        &self.around_king[slot(side)]
    }
}
