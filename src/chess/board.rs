use super::{Cell, ChessError, PieceId, PieceKind, Side};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Piece instance to cell mapping for one side
pub type Pieces = BTreeMap<PieceId, Cell>;

/// Board as two per-side mappings from piece instance to cell.
///
/// Within one side no two pieces share a cell. Across sides a cell is never
/// shared after a committed move: [`Board::relocate`] removes the defender
/// before the attacker lands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    white: Pieces,
    black: Pieces,
}

/// Serializable view of a board handed to collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub white: Pieces,
    pub black: Pieces,
    pub to_move: Side,
    /// SHA-256 of the canonical position, lowercase hex
    pub state_hash: String,
}

const BACK_RANK: [PieceId; 8] = [
    PieceId::rook(1),
    PieceId::knight(1),
    PieceId::bishop(1),
    PieceId::QUEEN,
    PieceId::KING,
    PieceId::bishop(2),
    PieceId::knight(2),
    PieceId::rook(2),
];

impl Board {
    /// Create a board with the standard starting position
    pub fn new() -> Self {
        let mut board = Self::empty();
        for side in Side::BOTH {
            let pieces = board.pieces_mut(side);
            for (file, piece) in BACK_RANK.iter().enumerate() {
                pieces.insert(*piece, Cell::new_unchecked(file as u8, side.back_rank()));
            }
            for file in 0..8u8 {
                pieces.insert(
                    PieceId::pawn(file + 1),
                    Cell::new_unchecked(file, side.pawn_rank()),
                );
            }
        }
        board
    }

    /// Create a board with no pieces
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a board from `(side, piece, cell)` triples in notation,
    /// e.g. `(Side::White, "K", "e1")`
    pub fn from_placements(placements: &[(Side, &str, &str)]) -> Result<Self, ChessError> {
        let mut board = Self::empty();
        for (side, piece, cell) in placements {
            board.place(*side, piece.parse()?, cell.parse()?)?;
        }
        Ok(board)
    }

    pub fn pieces(&self, side: Side) -> &Pieces {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    fn pieces_mut(&mut self, side: Side) -> &mut Pieces {
        match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        }
    }

    pub fn cell_of(&self, side: Side, piece: PieceId) -> Option<Cell> {
        self.pieces(side).get(&piece).copied()
    }

    pub fn piece_at(&self, side: Side, cell: Cell) -> Option<PieceId> {
        self.pieces(side)
            .iter()
            .find_map(|(piece, at)| (*at == cell).then_some(*piece))
    }

    /// The side and piece standing on `cell`, if any
    pub fn occupant(&self, cell: Cell) -> Option<(Side, PieceId)> {
        Side::BOTH
            .iter()
            .find_map(|side| self.piece_at(*side, cell).map(|piece| (*side, piece)))
    }

    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.occupant(cell).is_some()
    }

    /// Cell of the side's king
    pub fn king(&self, side: Side) -> Option<Cell> {
        self.cell_of(side, PieceId::KING)
    }

    /// Put a piece on an empty cell (or move it within its own side when the
    /// target is empty). Used for position setup; moves go through `relocate`.
    pub fn place(&mut self, side: Side, piece: PieceId, cell: Cell) -> Result<(), ChessError> {
        if let Some((occupant_side, occupant)) = self.occupant(cell) {
            if occupant_side != side || occupant != piece {
                return Err(ChessError::InvalidCell(format!(
                    "{} is already occupied by {} {}",
                    cell, occupant_side, occupant
                )));
            }
        }
        self.pieces_mut(side).insert(piece, cell);
        Ok(())
    }

    /// Move `piece` to `to`, removing an opponent piece standing there first.
    /// Returns the captured piece. Legality is the caller's concern; this only
    /// preserves the no-shared-cell invariant.
    pub fn relocate(
        &mut self,
        side: Side,
        piece: PieceId,
        to: Cell,
    ) -> Result<Option<PieceId>, ChessError> {
        if !self.pieces(side).contains_key(&piece) {
            return Err(ChessError::UnknownPiece(piece.to_string()));
        }
        if let Some(own) = self.piece_at(side, to) {
            return Err(ChessError::IllegalMove(format!(
                "{} is occupied by own {}",
                to, own
            )));
        }

        let captured = self.piece_at(side.opposite(), to);
        if let Some(captured) = captured {
            self.pieces_mut(side.opposite()).remove(&captured);
        }
        self.pieces_mut(side).insert(piece, to);
        Ok(captured)
    }

    pub fn remove(&mut self, side: Side, piece: PieceId) -> Option<Cell> {
        self.pieces_mut(side).remove(&piece)
    }

    /// Canonical text form used for hashing: `w:K@e1,...;b:...;to_move`
    fn canonical(&self, to_move: Side) -> String {
        let render = |pieces: &Pieces| {
            pieces
                .iter()
                .map(|(piece, cell)| format!("{piece}@{cell}"))
                .collect::<Vec<_>>()
                .join(",")
        };
        let to_move = match to_move {
            Side::White => "w",
            Side::Black => "b",
        };
        format!(
            "w:{};b:{};{}",
            render(&self.white),
            render(&self.black),
            to_move
        )
    }

    /// SHA-256 of the position and side to move, lowercase hex
    pub fn state_hash(&self, to_move: Side) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical(to_move).as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn snapshot(&self, to_move: Side) -> BoardSnapshot {
        BoardSnapshot {
            white: self.white.clone(),
            black: self.black.clone(),
            to_move,
            state_hash: self.state_hash(to_move),
        }
    }

    /// Display the board as ASCII art from White's perspective.
    /// White pieces are uppercase, Black lowercase, empty cells `.`
    pub fn to_ascii(&self) -> String {
        let mut grid = [['.'; 8]; 8];
        for side in Side::BOTH {
            for (piece, cell) in self.pieces(side) {
                let letter = piece.kind.letter();
                grid[cell.rank() as usize][cell.file() as usize] = match side {
                    Side::White => letter,
                    Side::Black => letter.to_ascii_lowercase(),
                };
            }
        }

        let mut result = String::new();
        result.push_str("  a b c d e f g h\n");
        for rank in (0..8).rev() {
            let rank_number = rank + 1;
            let row: Vec<String> = grid[rank].iter().map(|c| c.to_string()).collect();
            result.push_str(&format!("{rank_number} {} {rank_number}\n", row.join(" ")));
        }
        result.push_str("  a b c d e f g h");
        result
    }

    /// Count of pieces of a kind on one side
    pub fn count(&self, side: Side, kind: PieceKind) -> usize {
        self.pieces(side).keys().filter(|p| p.kind == kind).count()
    }
}
