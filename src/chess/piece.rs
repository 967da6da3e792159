use super::error::ChessError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::White, Side::Black];

    /// Opposite side
    pub fn opposite(&self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Rank step a pawn of this side advances by
    pub fn forward(&self) -> i8 {
        match self {
            Side::White => 1,
            Side::Black => -1,
        }
    }

    /// Zero-based rank pawns start on
    pub fn pawn_rank(&self) -> u8 {
        match self {
            Side::White => 1,
            Side::Black => 6,
        }
    }

    /// Zero-based rank of the back row
    pub fn back_rank(&self) -> u8 {
        match self {
            Side::White => 0,
            Side::Black => 7,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => write!(f, "White"),
            Side::Black => write!(f, "Black"),
        }
    }
}

impl FromStr for Side {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "white" | "w" => Ok(Side::White),
            "black" | "b" => Ok(Side::Black),
            _ => Err(ChessError::InvalidSide(format!(
                "Expected 'white' or 'black', got '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

impl PieceKind {
    /// Sliding pieces move along rays and can have their checks blocked
    pub fn is_slider(&self) -> bool {
        matches!(self, PieceKind::Rook | PieceKind::Bishop | PieceKind::Queen)
    }

    pub fn letter(&self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Rook => 'R',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    fn from_letter(c: char) -> Option<PieceKind> {
        match c.to_ascii_uppercase() {
            'P' => Some(PieceKind::Pawn),
            'R' => Some(PieceKind::Rook),
            'N' => Some(PieceKind::Knight),
            'B' => Some(PieceKind::Bishop),
            'Q' => Some(PieceKind::Queen),
            'K' => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Whether a side can hold more than one piece of this kind
    fn is_numbered(&self) -> bool {
        !matches!(self, PieceKind::Queen | PieceKind::King)
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A piece instance, unique within its side.
///
/// Pieces are tracked by identity rather than by scanning squares, so every
/// instance carries a stable label: `K`, `Q`, `R1`, `R2`, `N1`, `N2`, `B1`,
/// `B2` and `P1`..`P8` (pawns numbered by their starting file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PieceId {
    pub kind: PieceKind,
    pub index: u8,
}

impl PieceId {
    pub const KING: PieceId = PieceId {
        kind: PieceKind::King,
        index: 0,
    };
    pub const QUEEN: PieceId = PieceId {
        kind: PieceKind::Queen,
        index: 0,
    };

    pub const fn new(kind: PieceKind, index: u8) -> Self {
        Self { kind, index }
    }

    pub const fn pawn(index: u8) -> Self {
        Self::new(PieceKind::Pawn, index)
    }

    pub const fn rook(index: u8) -> Self {
        Self::new(PieceKind::Rook, index)
    }

    pub const fn knight(index: u8) -> Self {
        Self::new(PieceKind::Knight, index)
    }

    pub const fn bishop(index: u8) -> Self {
        Self::new(PieceKind::Bishop, index)
    }

    pub fn is_king(&self) -> bool {
        self.kind == PieceKind::King
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_numbered() {
            write!(f, "{}{}", self.kind, self.index)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl FromStr for PieceId {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let kind = chars
            .next()
            .and_then(PieceKind::from_letter)
            .ok_or_else(|| {
                ChessError::InvalidPiece(format!(
                    "Expected one of P, R, N, B, Q, K followed by an index, got '{}'",
                    s
                ))
            })?;
        let rest: String = chars.collect();

        if !kind.is_numbered() {
            return if rest.is_empty() || rest == "0" {
                Ok(PieceId::new(kind, 0))
            } else {
                Err(ChessError::InvalidPiece(format!(
                    "{} takes no index, got '{}'",
                    kind, s
                )))
            };
        }

        let index = rest.parse::<u8>().map_err(|_| {
            ChessError::InvalidPiece(format!("Missing or invalid index in '{}'", s))
        })?;
        if index == 0 || index > 8 {
            return Err(ChessError::InvalidPiece(format!(
                "Index must be 1-8, got {} in '{}'",
                index, s
            )));
        }
        Ok(PieceId::new(kind, index))
    }
}

impl TryFrom<String> for PieceId {
    type Error = ChessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PieceId> for String {
    fn from(piece: PieceId) -> Self {
        piece.to_string()
    }
}
