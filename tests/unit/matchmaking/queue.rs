use crate::common::test_data::{pid, registered};
use mate_arena::game::SidePreference;
use mate_arena::matchmaking::{MatchmakingSettings, QueueEntry, WaitingQueue};
use std::time::Duration;
use tokio::time::Instant;

fn entry(id: &str, rating: i32, enqueued_at: Instant, preference: SidePreference) -> QueueEntry {
    QueueEntry {
        participant: registered(id),
        rating,
        enqueued_at,
        preference,
    }
}

#[test]
fn test_acceptance_range_widens_in_steps() {
    let settings = MatchmakingSettings::default();
    assert_eq!(settings.acceptance_range(Duration::ZERO), 100);
    assert_eq!(settings.acceptance_range(Duration::from_millis(4_999)), 100);
    assert_eq!(settings.acceptance_range(Duration::from_secs(5)), 150);
    assert_eq!(settings.acceptance_range(Duration::from_secs(10)), 200);
    assert_eq!(settings.acceptance_range(Duration::from_secs(60)), 700);
}

#[test]
fn test_distant_ratings_match_once_range_grows() {
    let settings = MatchmakingSettings::default();
    let start = Instant::now();
    let mut queue = WaitingQueue::new();
    queue.enqueue(entry("low", 1000, start, SidePreference::Random));
    queue.enqueue(entry("high", 1200, start, SidePreference::Random));

    assert!(queue.find_match(start, &settings).is_none());
    assert!(queue.find_match(start + Duration::from_secs(5), &settings).is_none());

    let pairing = queue
        .find_match(start + Duration::from_secs(10), &settings)
        .expect("gap of 200 fits after 10s");
    let mut ids = [pairing.white.id().clone(), pairing.black.id().clone()];
    ids.sort();
    assert_eq!(ids, [pid("high"), pid("low")]);
    assert!(queue.is_empty());
}

#[test]
fn test_oldest_compatible_pair_first() {
    let settings = MatchmakingSettings::default();
    let start = Instant::now();
    let mut queue = WaitingQueue::new();
    queue.enqueue(entry("a", 1500, start, SidePreference::Random));
    queue.enqueue(entry("b", 1000, start, SidePreference::Random));
    queue.enqueue(entry("c", 1050, start, SidePreference::Random));
    queue.enqueue(entry("d", 1520, start, SidePreference::Random));

    let first = queue.find_match(start, &settings).unwrap();
    let ids = [first.white.id().clone(), first.black.id().clone()];
    assert!(ids.contains(&pid("a")) && ids.contains(&pid("d")));

    let second = queue.find_match(start, &settings).unwrap();
    let ids = [second.white.id().clone(), second.black.id().clone()];
    assert!(ids.contains(&pid("b")) && ids.contains(&pid("c")));
}

#[test]
fn test_preferences_decide_sides() {
    let settings = MatchmakingSettings::default();
    let start = Instant::now();
    let mut queue = WaitingQueue::new();
    queue.enqueue(entry("first", 1200, start, SidePreference::Black));
    queue.enqueue(entry("second", 1200, start, SidePreference::Random));

    let pairing = queue.find_match(start, &settings).unwrap();
    assert_eq!(pairing.black.id(), &pid("first"));
    assert_eq!(pairing.white.id(), &pid("second"));
    assert_eq!(pairing.white.participant.display_name, "SECOND");

    queue.enqueue(entry("x", 1200, start, SidePreference::White));
    queue.enqueue(entry("y", 1200, start, SidePreference::White));
    // Same preference on both sides: one of them is overruled
    let pairing = queue.find_match(start, &settings).unwrap();
    assert_ne!(pairing.white.id(), pairing.black.id());
}

#[test]
fn test_status_reports_position_and_estimate() {
    let settings = MatchmakingSettings::default();
    let start = Instant::now();
    let mut queue = WaitingQueue::new();
    queue.enqueue(entry("a", 1000, start, SidePreference::Random));
    queue.enqueue(entry("b", 2000, start + Duration::from_secs(2), SidePreference::Random));

    let now = start + Duration::from_secs(7);
    let a = queue.status(&pid("a"), now, &settings).unwrap();
    assert_eq!(a.position, 1);
    assert_eq!(a.waited_secs, 7);
    assert_eq!(a.estimated_wait_secs, 12);
    assert_eq!(a.acceptance_range, 150);
    assert_eq!(a.players_in_queue, 2);

    let b = queue.status(&pid("b"), now, &settings).unwrap();
    assert_eq!(b.position, 2);
    assert_eq!(b.waited_secs, 5);
    assert_eq!(b.estimated_wait_secs, 15);

    let fresh = queue.status(&pid("a"), start, &settings).unwrap();
    assert_eq!(fresh.estimated_wait_secs, 10);
    assert!(queue.status(&pid("nobody"), now, &settings).is_none());
}

#[test]
fn test_rejoining_moves_entry_to_back() {
    let start = Instant::now();
    let mut queue = WaitingQueue::new();
    assert!(!queue.enqueue(entry("a", 1000, start, SidePreference::Random)));
    queue.enqueue(entry("b", 1000, start, SidePreference::Random));
    assert!(queue.enqueue(entry("a", 1100, start + Duration::from_secs(1), SidePreference::White)));

    let ids: Vec<_> = queue.entries().iter().map(|e| e.id().clone()).collect();
    assert_eq!(ids, vec![pid("b"), pid("a")]);
    assert_eq!(queue.entries()[1].rating, 1100);
}
