use crate::common::test_data::{cell, engine_at, piece, play, FOOLS_MATE};
use mate_arena::chess::{ChessError, Engine, Side};

#[test]
fn test_turns_alternate() {
    let mut engine = Engine::new();
    assert_eq!(engine.to_move(), Side::White);

    engine.apply(Side::White, piece("N2"), cell("f3")).unwrap();
    assert_eq!(engine.to_move(), Side::Black);
    assert!(matches!(
        engine.apply(Side::White, piece("N1"), cell("c3")),
        Err(ChessError::IllegalMove(_))
    ));

    engine.apply(Side::Black, piece("N2"), cell("f6")).unwrap();
    assert_eq!(engine.to_move(), Side::White);
}

#[test]
fn test_fools_mate_is_detected() {
    let (engine, records) = play(&FOOLS_MATE);
    let last = records.last().unwrap();
    assert!(last.is_mate());
    let mate = last.effect.mate.unwrap();
    assert_eq!(mate.side, Side::White);
    assert_eq!(mate.by, piece("Q"));
    assert!(engine.legal_moves().is_empty());
    assert_eq!(records.iter().filter(|r| r.effect.check.is_some()).count(), 1);
}

#[test]
fn test_snapshot_tracks_position() {
    let mut engine = Engine::new();
    let start = engine.snapshot();
    assert_eq!(start.to_move, Side::White);

    engine.apply(Side::White, piece("P5"), cell("e4")).unwrap();
    let after = engine.snapshot();
    assert_eq!(after.to_move, Side::Black);
    assert_ne!(after.state_hash, start.state_hash);
    assert_eq!(after.white.get(&piece("P5")), Some(&cell("e4")));
    assert_eq!(after.state_hash.len(), 64);
}

#[test]
fn test_position_with_existing_check() {
    let engine = engine_at(
        &[
            (Side::White, "K", "e1"),
            (Side::Black, "K", "e8"),
            (Side::Black, "Q", "e4"),
        ],
        Side::White,
    );
    let check = engine.turn().check.expect("white starts in check");
    assert_eq!(check.side, Side::White);
    assert_eq!(check.by, piece("Q"));

    let quiet = engine_at(&[(Side::White, "K", "e1"), (Side::Black, "K", "e8")], Side::White);
    assert!(quiet.turn().check.is_none());
}

#[test]
fn test_ascii_board_after_opening() {
    let (engine, _) = play(&[("P5", "e4"), ("P5", "e5")]);
    let ascii = engine.board().to_ascii();
    let rank4 = ascii.lines().find(|l| l.starts_with("4 ")).unwrap();
    assert_eq!(rank4, "4 . . . . P . . . 4");
    let rank5 = ascii.lines().find(|l| l.starts_with("5 ")).unwrap();
    assert_eq!(rank5, "5 . . . . p . . . 5");
}

#[test]
fn test_snapshot_hash_is_hex_and_tracks_moves() {
    let hex = regex::Regex::new(r"^[0-9a-f]{64}$").unwrap();
    let mut engine = Engine::new();
    let before = engine.snapshot();
    assert!(hex.is_match(&before.state_hash));

    engine.apply(Side::White, piece("P5"), cell("e4")).unwrap();
    let after = engine.snapshot();
    assert!(hex.is_match(&after.state_hash));
    assert_ne!(before.state_hash, after.state_hash);
}
