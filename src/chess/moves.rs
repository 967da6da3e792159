use super::{Cell, PieceId, Side};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A piece removed by a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    /// Side that lost the piece
    pub side: Side,
    pub piece: PieceId,
    pub cell: Cell,
}

/// `side` is in check, attributed to the attacking piece `by`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub side: Side,
    pub by: PieceId,
}

/// `side` is checkmated; `by` delivered the final check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MateRecord {
    pub side: Side,
    pub by: PieceId,
}

/// Consequences of a committed move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEffect {
    pub capture: Option<Capture>,
    pub check: Option<CheckRecord>,
    pub mate: Option<MateRecord>,
}

/// One entry of a game's move log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub side: Side,
    pub piece: PieceId,
    pub from: Cell,
    pub to: Cell,
    #[serde(flatten)]
    pub effect: MoveEffect,
}

impl MoveRecord {
    pub fn is_capture(&self) -> bool {
        self.effect.capture.is_some()
    }

    pub fn is_mate(&self) -> bool {
        self.effect.mate.is_some()
    }
}

/// Short notation: `Q d1-d8`, `R1 a1xa5+`, `Q h5xf7#`
impl fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joiner = if self.is_capture() { 'x' } else { '-' };
        write!(f, "{} {}{}{}", self.piece, self.from, joiner, self.to)?;
        if self.is_mate() {
            write!(f, "#")?;
        } else if self.effect.check.is_some() {
            write!(f, "+")?;
        }
        Ok(())
    }
}

/// A move request as it arrives from a client: piece label and destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub piece: PieceId,
    pub to: Cell,
}

impl MoveRequest {
    pub fn new(piece: PieceId, to: Cell) -> Self {
        Self { piece, to }
    }

    /// Parse from notation, e.g. `("P5", "e4")`
    pub fn parse(piece: &str, to: &str) -> Result<Self, super::ChessError> {
        Ok(Self {
            piece: piece.parse()?,
            to: to.parse()?,
        })
    }
}
