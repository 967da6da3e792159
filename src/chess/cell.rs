use super::error::ChessError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the 64 squares of the grid.
///
/// A `Cell` is always on the board; stepping off the edge yields `None` from
/// [`Cell::offset`], so an out-of-range destination can never reach the
/// validator as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cell {
    file: u8, // 0-7 corresponding to a-h
    rank: u8, // 0-7 corresponding to 1-8
}

impl Cell {
    pub fn new(file: u8, rank: u8) -> Result<Self, ChessError> {
        if file > 7 {
            return Err(ChessError::InvalidCell(format!(
                "File must be 0-7, got {}",
                file
            )));
        }
        if rank > 7 {
            return Err(ChessError::InvalidCell(format!(
                "Rank must be 0-7, got {}",
                rank
            )));
        }

        Ok(Self { file, rank })
    }

    /// Create a cell without validation (for internal use when bounds are guaranteed)
    pub(crate) const fn new_unchecked(file: u8, rank: u8) -> Self {
        Self { file, rank }
    }

    pub fn file(&self) -> u8 {
        self.file
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    /// Create a cell from file and rank characters
    pub fn from_chars(file: char, rank: char) -> Result<Self, ChessError> {
        let file_lower = file.to_ascii_lowercase();
        if !('a'..='h').contains(&file_lower) {
            return Err(ChessError::InvalidCell(format!(
                "Invalid file '{}'. Must be a-h.",
                file
            )));
        }

        if !('1'..='8').contains(&rank) {
            return Err(ChessError::InvalidCell(format!(
                "Invalid rank '{}'. Must be 1-8.",
                rank
            )));
        }

        Ok(Cell {
            file: file_lower as u8 - b'a',
            rank: rank as u8 - b'1',
        })
    }

    pub fn file_char(&self) -> char {
        (self.file + b'a') as char
    }

    pub fn rank_char(&self) -> char {
        (self.rank + b'1') as char
    }

    /// The cell `df` files and `dr` ranks away, if it is still on the grid
    pub fn offset(&self, df: i8, dr: i8) -> Option<Cell> {
        let file = self.file as i8 + df;
        let rank = self.rank as i8 + dr;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Some(Cell::new_unchecked(file as u8, rank as u8))
        } else {
            None
        }
    }

    /// The up to eight cells surrounding this one
    pub fn neighbours(&self) -> impl Iterator<Item = Cell> + '_ {
        const AROUND: [(i8, i8); 8] = [
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ];
        AROUND.iter().filter_map(move |&(df, dr)| self.offset(df, dr))
    }

    /// Cells strictly between `self` and `other` when they share a rank, file
    /// or diagonal; empty otherwise or when they are adjacent
    pub fn between(&self, other: &Cell) -> Vec<Cell> {
        let df = other.file as i8 - self.file as i8;
        let dr = other.rank as i8 - self.rank as i8;
        let aligned = df == 0 || dr == 0 || df.abs() == dr.abs();
        if !aligned || (df == 0 && dr == 0) {
            return Vec::new();
        }

        let step = (df.signum(), dr.signum());
        let mut cells = Vec::new();
        let mut current = *self;
        while let Some(next) = current.offset(step.0, step.1) {
            if next == *other {
                break;
            }
            cells.push(next);
            current = next;
        }
        cells
    }

    /// Get all cells on the board
    pub fn all() -> impl Iterator<Item = Cell> {
        (0..8).flat_map(|rank| (0..8).map(move |file| Cell { file, rank }))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank_char())
    }
}

impl FromStr for Cell {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(file), Some(rank), None) => Self::from_chars(file, rank),
            _ => Err(ChessError::InvalidCell(format!(
                "Cell must be exactly 2 characters (e.g., 'e4'), got '{}'",
                s
            ))),
        }
    }
}

impl TryFrom<String> for Cell {
    type Error = ChessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cell> for String {
    fn from(cell: Cell) -> Self {
        cell.to_string()
    }
}
