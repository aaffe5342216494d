//! Matchmaking against a real room registry.

use std::sync::Arc;
use std::time::Duration;

use gamehall_engine::EngineRegistry;
use gamehall_matchmaking::{MatchRequest, Matchmaker, MatchmakingConfig, MatchmakingError};
use gamehall_protocol::{Player, PlayerId, RoomState, ServerMessage};
use gamehall_room::{GameSessionConfig, LedgerEconomy, MemoryPersistence, RoomRegistry, RoomSpec};
use gamehall_session::SessionManager;
use tokio::sync::mpsc::UnboundedReceiver;

type Registry = RoomRegistry<LedgerEconomy<MemoryPersistence>, MemoryPersistence>;

struct Setup {
    rooms: Registry,
    matchmaker: Arc<Matchmaker<LedgerEconomy<MemoryPersistence>, MemoryPersistence>>,
    store: Arc<MemoryPersistence>,
    connections: Arc<SessionManager>,
}

fn setup() -> Setup {
    let store = Arc::new(MemoryPersistence::new());
    let connections = Arc::new(SessionManager::default());
    let rooms = RoomRegistry::new(
        Arc::new(EngineRegistry::with_defaults()),
        connections.clone(),
        Arc::new(LedgerEconomy::new(store.clone())),
        store.clone(),
        GameSessionConfig::default(),
    );
    let matchmaker = Arc::new(Matchmaker::new(rooms.clone(), MatchmakingConfig::default()));
    Setup {
        rooms,
        matchmaker,
        store,
        connections,
    }
}

impl Setup {
    fn player(&self, id: u64, coins: i64) -> (PlayerId, UnboundedReceiver<ServerMessage>) {
        let pid = PlayerId(id);
        self.store.insert_player(Player::new(pid, format!("p{id}"), coins));
        (pid, self.connections.connect(pid).unwrap())
    }
}

#[tokio::test]
async fn test_scan_groups_two_earliest_and_keeps_third() {
    let s = setup();
    let (a, mut ra) = s.player(1, 100);
    let (b, mut rb) = s.player(2, 100);
    let (c, mut rc) = s.player(3, 100);
    for p in [a, b, c] {
        s.matchmaker.enqueue(MatchRequest::new(p, "BINGO")).await.unwrap();
    }

    let outcomes = s.matchmaker.scan().await;

    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert_eq!(outcome.players, vec![a, b]);
    assert!(outcome.dropped.is_empty());

    let room = s.rooms.room(outcome.room_id).unwrap();
    assert_eq!(room.host_id, a);
    assert_eq!(room.state, RoomState::Waiting);
    assert_eq!(s.rooms.members(outcome.room_id).unwrap(), vec![a, b]);

    assert!(!s.matchmaker.is_queued(a).await);
    assert!(!s.matchmaker.is_queued(b).await);
    assert!(s.matchmaker.is_queued(c).await);
    assert_eq!(s.matchmaker.queued().await, 1);

    let found = ServerMessage::MatchFound {
        room_id: outcome.room_id,
        game_type: "BINGO".into(),
    };
    assert!(std::iter::from_fn(|| ra.try_recv().ok()).any(|m| m == found));
    assert!(std::iter::from_fn(|| rb.try_recv().ok()).any(|m| m == found));
    assert!(rc.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_join_is_dropped_not_requeued() {
    let s = setup();
    let (rich, _r1) = s.player(1, 100);
    let (poor, _r2) = s.player(2, 5);
    s.matchmaker.enqueue(MatchRequest::new(rich, "BINGO")).await.unwrap();
    s.matchmaker.enqueue(MatchRequest::new(poor, "BINGO")).await.unwrap();

    let outcomes = s.matchmaker.scan().await;

    assert_eq!(outcomes[0].players, vec![rich]);
    assert_eq!(outcomes[0].dropped, vec![poor]);
    assert_eq!(s.matchmaker.queued().await, 0);
    assert_eq!(s.rooms.room_of(poor), None);
    assert_eq!(s.store.player(poor).unwrap().coins, 5);
}

#[tokio::test]
async fn test_host_who_cannot_pay_hands_room_to_seated_player() {
    let s = setup();
    let (poor, _r1) = s.player(1, 5);
    let (rich, mut r2) = s.player(2, 100);
    let (late, _r3) = s.player(3, 100);
    s.matchmaker.enqueue(MatchRequest::new(poor, "BINGO")).await.unwrap();
    s.matchmaker.enqueue(MatchRequest::new(rich, "BINGO")).await.unwrap();

    let outcomes = s.matchmaker.scan().await;

    let room_id = outcomes[0].room_id;
    assert_eq!(outcomes[0].players, vec![rich]);
    assert_eq!(outcomes[0].dropped, vec![poor]);
    assert_eq!(s.rooms.room(room_id).unwrap().host_id, rich);
    assert!(
        std::iter::from_fn(|| r2.try_recv().ok())
            .any(|m| m == ServerMessage::HostChanged { room_id, host_id: rich })
    );

    s.rooms.join(late, room_id, None).await.unwrap();
    s.rooms.start(rich, room_id).await.unwrap();
    assert_eq!(s.rooms.room(room_id).unwrap().state, RoomState::InGame);
}

#[tokio::test]
async fn test_all_joins_failing_closes_the_room() {
    let s = setup();
    let (a, _ra) = s.player(1, 0);
    let (b, _rb) = s.player(2, 0);
    s.matchmaker.enqueue(MatchRequest::new(a, "BINGO")).await.unwrap();
    s.matchmaker.enqueue(MatchRequest::new(b, "BINGO")).await.unwrap();

    assert!(s.matchmaker.scan().await.is_empty());
    assert!(s.rooms.is_empty());
}

#[tokio::test]
async fn test_enqueue_validation() {
    let s = setup();
    let (a, _ra) = s.player(1, 100);

    assert!(matches!(
        s.matchmaker.enqueue(MatchRequest::new(a, "CHESS")).await,
        Err(MatchmakingError::UnknownGameType(_))
    ));

    let room = s
        .rooms
        .create(a, RoomSpec::new("mine", "NUMBER_GUESS"))
        .unwrap();
    s.rooms.join(a, room.id, None).await.unwrap();
    let err = s
        .matchmaker
        .enqueue(MatchRequest::new(a, "BINGO"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), 409);

    assert!(matches!(
        s.matchmaker.dequeue(PlayerId(42)).await,
        Err(MatchmakingError::NotQueued(_))
    ));
}

#[tokio::test]
async fn test_game_types_are_matched_separately() {
    let s = setup();
    let (a, _ra) = s.player(1, 100);
    let (b, _rb) = s.player(2, 100);
    s.matchmaker.enqueue(MatchRequest::new(a, "BINGO")).await.unwrap();
    s.matchmaker
        .enqueue(MatchRequest::new(b, "NUMBER_GUESS"))
        .await
        .unwrap();

    assert!(s.matchmaker.scan().await.is_empty());
    assert_eq!(s.matchmaker.queued().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_background_scanner_forms_matches() {
    let s = setup();
    let (a, _ra) = s.player(1, 100);
    let (b, _rb) = s.player(2, 100);
    let handle = s.matchmaker.clone().spawn();

    s.matchmaker
        .enqueue(MatchRequest::new(a, "NUMBER_GUESS"))
        .await
        .unwrap();
    s.matchmaker
        .enqueue(MatchRequest::new(b, "NUMBER_GUESS"))
        .await
        .unwrap();
    assert!(s.rooms.room_of(a).is_none());

    tokio::time::sleep(Duration::from_millis(2_100)).await;

    let room_id = s.rooms.room_of(a).unwrap();
    assert_eq!(s.rooms.room_of(b), Some(room_id));
    handle.abort();
}
