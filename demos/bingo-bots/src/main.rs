use std::collections::BTreeSet;
use std::sync::Arc;

use gamehall::engine::bingo;
use gamehall::prelude::*;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

type Hall = GameHall<LedgerEconomy<MemoryPersistence>, MemoryPersistence>;

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

/// Calls the lowest number nobody has called yet whenever it's its turn.
struct Bot {
    id: PlayerId,
    hall: Arc<Hall>,
    called: BTreeSet<i64>,
}

impl Bot {
    async fn send(&self, msg: &ClientMessage) {
        match serde_json::to_vec(msg) {
            Ok(bytes) => self.hall.handle_bytes(self.id, &bytes).await,
            Err(e) => tracing::error!(player = %self.id, error = %e, "encode failed"),
        }
    }

    async fn call_next(&mut self) {
        let Some(number) = (1..=25).find(|n| !self.called.contains(n)) else {
            return;
        };
        info!(player = %self.id, number, "calling");
        let payload = json!({ "number": number }).as_object().cloned().unwrap_or_default();
        self.send(&ClientMessage::SendEvent {
            request_id: None,
            op_code: bingo::CALL_NUMBER,
            payload,
        })
        .await;
    }

    /// Plays until the game is over and returns the result.
    async fn play(mut self, mut inbox: UnboundedReceiver<ServerMessage>) -> Option<GameResult> {
        while let Some(msg) = inbox.recv().await {
            match msg {
                ServerMessage::GameStarted { view } => {
                    if view.turn_order.get(view.current_turn_index) == Some(&self.id) {
                        self.call_next().await;
                    }
                }
                ServerMessage::Event { event } if event.op_code == bingo::NUMBER_CALLED => {
                    if let Some(number) = event.payload.get("number").and_then(|v| v.as_i64()) {
                        self.called.insert(number);
                    }
                    let next = event.payload.get("nextTurn").and_then(|v| v.as_u64());
                    if next == Some(self.id.0) {
                        self.call_next().await;
                    }
                }
                ServerMessage::GameOver { result, .. } => return Some(result),
                ServerMessage::Error { code, message, .. } => {
                    tracing::warn!(player = %self.id, code, %message, "request failed");
                }
                _ => {}
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), GamehallError> {
    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    init_tracing(&config.log_level);

    let store = Arc::new(MemoryPersistence::new());
    let hall = Arc::new(GameHall::builder().config(config).build(store.clone()));
    let _tasks = hall.start_background();

    let alice = PlayerId(1);
    let bob = PlayerId(2);
    store.insert_player(Player::new(alice, "alice", 100));
    store.insert_player(Player::new(bob, "bob", 100));
    let alice_rx = hall.connect(alice)?;
    let bob_rx = hall.connect(bob)?;

    let created = hall
        .request(
            alice,
            ClientMessage::CreateRoom {
                request_id: Some("create".into()),
                name: "bot table".into(),
                game_type: bingo::GAME_TYPE.into(),
                max_players: 2,
                is_private: false,
                password: None,
                options: Default::default(),
            },
        )
        .await;
    let room_id = match created {
        ServerMessage::RoomJoined { room, .. } => room.id,
        other => {
            tracing::error!(reply = ?other, "could not create room");
            return Ok(());
        }
    };
    info!(%room_id, "room created");

    let joined = hall
        .request(
            bob,
            ClientMessage::JoinRoom {
                request_id: None,
                room_id,
                password: None,
            },
        )
        .await;
    info!(reply = ?joined, "bob joined");

    let bots = [(alice, alice_rx), (bob, bob_rx)].map(|(id, rx)| {
        let bot = Bot {
            id,
            hall: hall.clone(),
            called: BTreeSet::new(),
        };
        tokio::spawn(bot.play(rx))
    });

    let started = hall
        .request(alice, ClientMessage::StartGame { request_id: None })
        .await;
    info!(reply = ?started, "start requested");

    for bot in bots {
        if let Ok(Some(result)) = bot.await {
            info!(winners = ?result.winner_ids, summary = ?result.summary, "game over");
        }
    }

    for id in [alice, bob] {
        if let Some(player) = store.player(id) {
            info!(
                player = %player.username,
                coins = player.coins,
                xp = player.xp,
                elo = player.elo,
                "final profile"
            );
        }
    }
    Ok(())
}
