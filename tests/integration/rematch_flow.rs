use crate::common::test_helpers::TestArena;
use mate_arena::chess::Side;
use mate_arena::game::{lock_session, GameError, GameId, ParticipantId};
use mate_arena::services::Event;
use std::time::Duration;

/// Lobby game alice (White) vs bob (Black), ended by bob resigning
fn finished_game(arena: &TestArena) -> (ParticipantId, ParticipantId, GameId) {
    let alice = arena.connect("alice", true);
    let bob = arena.connect("bob", true);
    let game = arena.start_lobby_game(&alice, &bob);
    arena.coordinator.resign(&bob, game).unwrap();
    (alice, bob, game)
}

#[tokio::test(start_paused = true)]
async fn test_rematch_swaps_sides() {
    let arena = TestArena::new();
    let (alice, bob, game) = finished_game(&arena);

    arena.coordinator.propose_rematch(&alice, game).unwrap();
    assert!(arena.notifier.names_for(&bob).contains(&"matchmaking:rematch_propose"));

    let snapshot = arena.coordinator.accept_rematch(&bob, game).unwrap();
    assert_ne!(snapshot.id, game);
    assert!(snapshot.started);

    let session = arena.coordinator.registry().active(snapshot.id).unwrap();
    let session = lock_session(&session);
    assert_eq!(session.side_of(&alice), Some(Side::Black));
    assert_eq!(session.side_of(&bob), Some(Side::White));
    drop(session);

    let accepted = arena
        .notifier
        .received_by(&alice)
        .into_iter()
        .find(|e| e.name() == "matchmaking:rematch_accept")
        .expect("rematch accept delivered");
    match accepted {
        Event::RematchAccepted { previous_game, game: new_game } => {
            assert_eq!(previous_game, game);
            assert_eq!(new_game.id, snapshot.id);
        }
        other => panic!("unexpected event {:?}", other),
    }

    arena.coordinator.make_move(&bob, snapshot.id, "P5", "e4").unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_rematch_rejections() {
    let arena = TestArena::new();
    let (alice, bob, game) = finished_game(&arena);
    let carol = arena.connect("carol", true);

    assert!(matches!(
        arena.coordinator.propose_rematch(&carol, game),
        Err(GameError::NotFound(_))
    ));
    assert!(matches!(
        arena.coordinator.propose_rematch(&alice, GameId::new()),
        Err(GameError::NotFound(_))
    ));
    assert!(matches!(
        arena.coordinator.accept_rematch(&bob, game),
        Err(GameError::NotFound(_))
    ));

    arena.coordinator.propose_rematch(&alice, game).unwrap();
    assert!(matches!(
        arena.coordinator.propose_rematch(&bob, game),
        Err(GameError::Conflict(_))
    ));
    assert!(matches!(
        arena.coordinator.accept_rematch(&alice, game),
        Err(GameError::Conflict(_))
    ));

    arena.coordinator.reject_rematch(&bob, game).unwrap();
    assert!(arena.notifier.names_for(&alice).contains(&"matchmaking:rematch_reject"));
    assert!(matches!(
        arena.coordinator.accept_rematch(&bob, game),
        Err(GameError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_rematch_offer_expires() {
    let arena = TestArena::new();
    let (alice, bob, game) = finished_game(&arena);
    arena.coordinator.propose_rematch(&alice, game).unwrap();

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(
        arena.notifier.received_by(&bob).last(),
        Some(&Event::RematchRejected { game_id: game })
    );
    assert!(matches!(
        arena.coordinator.accept_rematch(&bob, game),
        Err(GameError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_rematch_with_disconnected_opponent() {
    let arena = TestArena::new();
    let (alice, bob, game) = finished_game(&arena);
    arena.coordinator.propose_rematch(&alice, game).unwrap();
    arena.coordinator.disconnect(&alice);

    let snapshot = arena.coordinator.accept_rematch(&bob, game).unwrap();
    let alice_seat = snapshot
        .players
        .iter()
        .find(|p| p.id == alice)
        .expect("alice seated from the previous game");
    assert_eq!(alice_seat.side, Side::Black);
    assert_eq!(alice_seat.display_name, "ALICE");
    assert!(alice_seat.authorized);
}
