use crate::common::test_data::cell;
use mate_arena::chess::{Cell, ChessError, MoveRequest};
use mate_arena::game::GameError;

#[test]
fn test_off_grid_cells_rejected() {
    for bad in ["a9", "i1", "a0", "", "e", "e44"] {
        let parsed: Result<Cell, ChessError> = bad.parse();
        assert!(
            matches!(parsed, Err(ChessError::InvalidCell(_))),
            "{bad:?} should not parse"
        );
    }
}

#[test]
fn test_move_off_the_board_is_a_validation_error() {
    let err = GameError::from(MoveRequest::parse("R1", "a9").unwrap_err());
    assert!(matches!(err, GameError::Validation(_)));

    let err = GameError::from(MoveRequest::parse("X3", "a4").unwrap_err());
    assert!(matches!(err, GameError::Validation(_)));
}

#[test]
fn test_cells_serialize_as_notation() {
    let json = serde_json::to_string(&cell("g7")).unwrap();
    assert_eq!(json, "\"g7\"");
    let back: Cell = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cell("g7"));
    assert!(serde_json::from_str::<Cell>("\"z7\"").is_err());
}

#[test]
fn test_between_on_diagonal_and_knight_jump() {
    let between: Vec<String> = cell("h4").between(&cell("e1")).iter().map(|c| c.to_string()).collect();
    assert_eq!(between, vec!["g3", "f2"]);
    assert!(cell("g1").between(&cell("f3")).is_empty());
}
