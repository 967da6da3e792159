use crate::common::test_helpers::TestArena;
use mate_arena::chess::Side;
use mate_arena::coordinator::QueueOutcome;
use mate_arena::game::{GameConfig, GameError, SidePreference};
use mate_arena::services::Event;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_close_ratings_pair_immediately() {
    let arena = TestArena::new();
    let alice = arena.connect("alice", true);
    let bob = arena.connect("bob", true);
    arena.ratings.set_rating(&alice, 1500);
    arena.ratings.set_rating(&bob, 1450);

    let first = arena
        .coordinator
        .join_queue(&alice, SidePreference::White)
        .await
        .unwrap();
    let QueueOutcome::Waiting { status } = first else {
        panic!("alone in the queue, got {:?}", first);
    };
    assert_eq!(status.position, 1);
    assert!(arena.notifier.names_for(&alice).contains(&"matchmaking:queue_status"));

    let second = arena
        .coordinator
        .join_queue(&bob, SidePreference::Random)
        .await
        .unwrap();
    let QueueOutcome::Matched { game_id } = second else {
        panic!("expected a match, got {:?}", second);
    };
    assert!(arena.coordinator.matchmaking().is_empty());

    let session = arena.coordinator.registry().active(game_id).unwrap();
    let session = mate_arena::game::lock_session(&session);
    assert_eq!(session.side_of(&alice), Some(Side::White));
    assert_eq!(session.side_of(&bob), Some(Side::Black));
    assert!(session.is_started());
    drop(session);

    for player in [&alice, &bob] {
        assert!(arena.notifier.names_for(player).contains(&"game:start"));
    }
    arena.coordinator.make_move(&alice, game_id, "P5", "e4").unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_matchmaker_sweep_widens_range() {
    let arena = TestArena::new();
    let low = arena.connect("low", true);
    let high = arena.connect("high", true);
    arena.ratings.set_rating(&low, 1000);
    arena.ratings.set_rating(&high, 1200);

    arena.coordinator.join_queue(&low, SidePreference::Random).await.unwrap();
    let outcome = arena.coordinator.join_queue(&high, SidePreference::Random).await.unwrap();
    assert!(matches!(outcome, QueueOutcome::Waiting { .. }));

    let matchmaker = arena.coordinator.spawn_matchmaker();
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(arena.coordinator.registry().active_count(), 0);
    assert!(arena.notifier.count("matchmaking:queue_status") >= 4);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(arena.coordinator.registry().active_count(), 1);
    assert!(arena.coordinator.matchmaking().is_empty());
    assert!(arena.coordinator.registry().find_by_participant(&low).is_some());
    matchmaker.abort();
}

#[tokio::test(start_paused = true)]
async fn test_queue_timeout_notifies_participant() {
    let arena = TestArena::new();
    let alice = arena.connect("alice", true);
    arena.coordinator.join_queue(&alice, SidePreference::Random).await.unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(!arena.coordinator.matchmaking().contains(&alice));
    assert_eq!(arena.notifier.received_by(&alice).last(), Some(&Event::QueueTimeout));
}

#[tokio::test(start_paused = true)]
async fn test_leave_queue_and_busy_players() {
    let arena = TestArena::new();
    let alice = arena.connect("alice", true);
    let bob = arena.connect("bob", true);
    let carol = arena.connect("carol", true);

    arena.coordinator.join_queue(&carol, SidePreference::Random).await.unwrap();
    assert!(arena.coordinator.leave_queue(&carol));
    assert!(!arena.coordinator.leave_queue(&carol));

    arena.start_lobby_game(&alice, &bob);
    assert!(matches!(
        arena.coordinator.join_queue(&alice, SidePreference::Random).await,
        Err(GameError::Conflict(_))
    ));

    let stranger = mate_arena::game::ParticipantId::from("stranger");
    assert!(matches!(
        arena.coordinator.join_queue(&stranger, SidePreference::Random).await,
        Err(GameError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_seating_withdraws_other_listings() {
    let arena = TestArena::new();
    let alice = arena.connect("alice", true);
    let bob = arena.connect("bob", true);
    let carol = arena.connect("carol", true);

    arena.coordinator.join_queue(&bob, SidePreference::Random).await.unwrap();
    arena.coordinator.create_game(&bob, GameConfig::default()).unwrap();
    let entry = arena.coordinator.create_game(&alice, GameConfig::default()).unwrap();
    assert_eq!(arena.coordinator.lobby().len(), 2);

    arena.coordinator.join_game(&bob, entry.id).unwrap();
    assert!(arena.coordinator.lobby().is_empty());
    assert!(!arena.coordinator.matchmaking().contains(&bob));
    assert!(arena.coordinator.registry().find_by_participant(&carol).is_none());
}

#[tokio::test]
async fn test_seated_during_rating_lookup_is_not_queued() {
    let (arena, gate) = TestArena::with_held_rating("alice");
    let alice = arena.connect("alice", true);
    let carol = arena.connect("carol", true);
    let dave = arena.connect("dave", true);

    arena.coordinator.join_queue(&dave, SidePreference::Random).await.unwrap();
    let listing = arena.coordinator.create_game(&carol, GameConfig::default()).unwrap();

    let coordinator = arena.coordinator.clone();
    let queued_id = alice.clone();
    let queued = tokio::spawn(async move {
        coordinator.join_queue(&queued_id, SidePreference::Random).await
    });
    gate.wait_for_lookup().await;

    arena.coordinator.join_game(&alice, listing.id).unwrap();
    gate.open();

    let outcome = queued.await.unwrap();
    assert!(matches!(outcome, Err(GameError::Conflict(_))), "got {:?}", outcome);
    assert_eq!(arena.coordinator.registry().active_count(), 1);
    assert_eq!(
        arena.coordinator.registry().find_by_participant(&alice).map(|(id, _)| id),
        Some(listing.id)
    );
    assert!(!arena.coordinator.matchmaking().contains(&alice));
    assert!(arena.coordinator.matchmaking().contains(&dave));
}

#[tokio::test]
async fn test_disconnect_during_rating_lookup() {
    let (arena, gate) = TestArena::with_held_rating("alice");
    let alice = arena.connect("alice", true);

    let coordinator = arena.coordinator.clone();
    let queued_id = alice.clone();
    let queued = tokio::spawn(async move {
        coordinator.join_queue(&queued_id, SidePreference::Random).await
    });
    gate.wait_for_lookup().await;

    arena.coordinator.disconnect(&alice);
    gate.open();

    assert!(matches!(queued.await.unwrap(), Err(GameError::NotFound(_))));
    assert!(arena.coordinator.matchmaking().is_empty());
    assert!(!arena.coordinator.matchmaking().has_wait_timer(&alice));
}

#[tokio::test(start_paused = true)]
async fn test_unseatable_pairing_returns_partner_to_queue() {
    let arena = TestArena::new();
    let alice = arena.connect("alice", true);
    let bob = arena.connect("bob", true);
    let dave = arena.connect("dave", true);
    let game = arena.start_lobby_game(&alice, &bob);

    arena.coordinator.join_queue(&dave, SidePreference::Random).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    // A stale entry for a player who is already seated
    let seated = arena.coordinator.connected(&alice).unwrap();
    arena
        .coordinator
        .matchmaking()
        .enqueue(seated, 1200, SidePreference::Random, |_| {});

    assert!(arena.coordinator.match_waiting().is_empty());
    assert_eq!(arena.coordinator.registry().active_count(), 1);
    assert_eq!(
        arena.coordinator.registry().find_by_participant(&alice).map(|(id, _)| id),
        Some(game)
    );

    let queue = arena.coordinator.matchmaking();
    assert!(!queue.contains(&alice));
    assert!(queue.contains(&dave));
    assert!(queue.has_wait_timer(&dave));
    let status = queue.status(&dave).unwrap();
    assert_eq!(status.position, 1);
    assert!(status.waited_secs >= 10, "wait time kept, got {}", status.waited_secs);

    // The restored entry still expires on its original schedule
    tokio::time::sleep(Duration::from_secs(51)).await;
    assert!(!queue.contains(&dave));
    assert_eq!(arena.notifier.received_by(&dave).last(), Some(&Event::QueueTimeout));
}
