use crate::common::test_helpers::TestArena;
use mate_arena::game::{GameConfig, GameError, SessionStatus, SidePreference};
use mate_arena::services::{Event, IdentityResolver, TokenAuthority};

#[tokio::test]
async fn test_disconnect_cleans_queue_and_lobby() {
    let arena = TestArena::new();
    let alice = arena.connect("alice", true);
    let bob = arena.connect("bob", true);

    arena.coordinator.join_queue(&alice, SidePreference::Random).await.unwrap();
    arena.coordinator.create_game(&alice, GameConfig::default()).unwrap();
    arena.notifier.clear();

    arena.coordinator.disconnect(&alice);
    assert!(!arena.coordinator.matchmaking().contains(&alice));
    assert!(arena.coordinator.lobby().is_empty());
    assert_eq!(
        arena.notifier.received_by(&bob),
        vec![Event::LobbyUpdate { games: vec![] }]
    );
    assert!(arena.coordinator.connected(&alice).is_none());
    assert!(matches!(
        arena.coordinator.create_game(&alice, GameConfig::default()),
        Err(GameError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_disconnect_mid_game_then_rejoin() {
    let arena = TestArena::new();
    let alice = arena.connect("alice", true);
    let bob = arena.connect("bob", true);
    let game = arena.start_lobby_game(&alice, &bob);
    arena.play(game, &[(&alice, "P5", "e4")]);

    arena.coordinator.disconnect(&bob);
    assert!(matches!(
        arena.notifier.received_by(&alice).last(),
        Some(Event::OpponentDisconnected { participant, .. }) if *participant == bob
    ));
    let session = arena.coordinator.registry().active(game).unwrap();
    assert_eq!(mate_arena::game::lock_session(&session).status(), SessionStatus::Active);

    arena.notifier.clear();
    let returning = arena.connect("bob", true);
    let snapshot = arena.coordinator.rejoin(&returning).unwrap();
    assert_eq!(snapshot.id, game);
    assert_eq!(snapshot.moves.len(), 1);

    assert!(arena.notifier.names_for(&bob).contains(&"game:state"));
    assert!(matches!(
        arena.notifier.received_by(&alice).last(),
        Some(Event::PlayerReconnected { .. })
    ));
    arena.play(game, &[(&bob, "P5", "e5")]);
}

#[tokio::test]
async fn test_rejoin_without_game() {
    let arena = TestArena::new();
    let alice = arena.connect("alice", true);
    assert!(matches!(
        arena.coordinator.rejoin(&alice),
        Err(GameError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_connected_players_tracks_registered_only() {
    let arena = TestArena::new();
    let alice = arena.connect("alice", true);
    arena.connect("visitor", false);
    arena.connect("bob", true);
    arena.coordinator.flush().await;

    let connected = arena.coordinator.connected_players().await.unwrap();
    let ids: Vec<_> = connected.iter().map(|p| p.identity.as_str().to_string()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"alice".to_string()) && ids.contains(&"bob".to_string()));

    arena.coordinator.disconnect(&alice);
    arena.coordinator.flush().await;
    let connected = arena.coordinator.connected_players().await.unwrap();
    assert_eq!(connected.len(), 1);
}

#[tokio::test]
async fn test_token_resolution_on_connect() {
    let arena = TestArena::new();
    let authority = TokenAuthority::generate();
    let token = authority.issue("user-7", "Judit").unwrap();

    let member = arena
        .coordinator
        .connect(authority.resolve_or_anonymous(Some(&format!("Bearer {}", token))));
    assert!(member.authorized);
    assert_eq!(member.display_name, "Judit");

    let anonymous = arena
        .coordinator
        .connect(authority.resolve_or_anonymous(Some("garbage")));
    assert!(!anonymous.authorized);
    assert_ne!(anonymous.id, member.id);
}
