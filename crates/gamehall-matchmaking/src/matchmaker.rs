//! The matchmaker: queues players and periodically seats them in new rooms.
//!
//! A scan groups the queue by game type, takes the earliest
//! `min_players()` requests of each type, and for every full group creates
//! a room hosted by the earliest player and joins everyone into it. A
//! player whose join fails (usually the entry fee) is dropped from that
//! match and not requeued; if that player was the host, the earliest
//! seated player hosts instead.

use std::sync::Arc;
use std::time::Duration;

use gamehall_protocol::{GameType, PlayerId, RoomId, ServerMessage, now_millis};
use gamehall_room::{Economy, Persistence, RoomRegistry, RoomSpec};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::{MatchQueue, MatchRequest, MatchmakingError};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingConfig {
    /// Time between scans. Default: 2000.
    pub scan_interval_ms: u64,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 2_000,
        }
    }
}

impl MatchmakingConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(1))
    }
}

// ---------------------------------------------------------------------------
// Matchmaker
// ---------------------------------------------------------------------------

/// A room formed by one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub room_id: RoomId,
    pub game_type: GameType,
    /// Players who made it in, in queue order.
    pub players: Vec<PlayerId>,
    /// Players whose join failed.
    pub dropped: Vec<PlayerId>,
}

pub struct Matchmaker<E, P> {
    rooms: RoomRegistry<E, P>,
    queue: Mutex<MatchQueue>,
    config: MatchmakingConfig,
}

impl<E: Economy, P: Persistence> Matchmaker<E, P> {
    pub fn new(rooms: RoomRegistry<E, P>, config: MatchmakingConfig) -> Self {
        Self {
            rooms,
            queue: Mutex::new(MatchQueue::new()),
            config,
        }
    }

    /// Queues a player, replacing any request they already have pending.
    ///
    /// # Errors
    /// - [`MatchmakingError::UnknownGameType`]: no engine for the game type
    /// - [`MatchmakingError::AlreadyInRoom`]: the player is seated somewhere
    pub async fn enqueue(&self, request: MatchRequest) -> Result<(), MatchmakingError> {
        self.rooms.engines().get(request.game_type.as_str())?;
        if let Some(room_id) = self.rooms.room_of(request.player_id) {
            return Err(MatchmakingError::AlreadyInRoom(request.player_id, room_id));
        }

        let player_id = request.player_id;
        let game_type = request.game_type.clone();
        let replaced = self.queue.lock().await.enqueue(request);
        info!(%player_id, %game_type, replaced = replaced.is_some(), "player queued for match");
        Ok(())
    }

    /// # Errors
    /// [`MatchmakingError::NotQueued`] if the player had no pending request.
    pub async fn dequeue(&self, player: PlayerId) -> Result<MatchRequest, MatchmakingError> {
        let removed = self.queue.lock().await.remove(player);
        let request = removed.ok_or(MatchmakingError::NotQueued(player))?;
        debug!(%player, "player left match queue");
        Ok(request)
    }

    pub async fn is_queued(&self, player: PlayerId) -> bool {
        self.queue.lock().await.contains(player)
    }

    pub async fn queued(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Runs one matching pass and returns the rooms it formed.
    pub async fn scan(&self) -> Vec<MatchOutcome> {
        let groups = {
            let mut queue = self.queue.lock().await;
            let mut groups = Vec::new();
            for game_type in queue.game_types() {
                let needed = match self.rooms.engines().get(game_type.as_str()) {
                    Ok(engine) => engine.min_players(),
                    Err(e) => {
                        warn!(%game_type, error = %e, "no engine for queued game type");
                        continue;
                    }
                };
                while let Some(group) = queue.take_group(&game_type, needed) {
                    groups.push((game_type.clone(), group));
                }
            }
            groups
        };

        let mut outcomes = Vec::with_capacity(groups.len());
        for (game_type, group) in groups {
            if let Some(outcome) = self.form_match(game_type, group).await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    async fn form_match(&self, game_type: GameType, group: Vec<MatchRequest>) -> Option<MatchOutcome> {
        let host = group.first()?.player_id;
        let spec = RoomSpec::new(format!("Match {}", now_millis()), game_type.clone())
            .max_players(group.len());
        let room = match self.rooms.create(host, spec) {
            Ok(room) => room,
            Err(e) => {
                error!(%game_type, error = %e, "could not create match room");
                return None;
            }
        };

        let mut players = Vec::with_capacity(group.len());
        let mut dropped = Vec::new();
        for request in &group {
            let player = request.player_id;
            match self.rooms.join(player, room.id, None).await {
                Ok(_) => {
                    players.push(player);
                    self.rooms.connections().send_to_player(
                        player,
                        ServerMessage::MatchFound {
                            room_id: room.id,
                            game_type: game_type.clone(),
                        },
                    );
                }
                Err(e) => {
                    warn!(%player, room_id = %room.id, error = %e, "dropping match request that failed to join");
                    dropped.push(player);
                }
            }
        }

        if players.is_empty() {
            if let Err(e) = self.rooms.close(room.id) {
                debug!(room_id = %room.id, error = %e, "empty match room already gone");
            }
            return None;
        }
        self.rooms.ensure_host_is_member(room.id);

        info!(room_id = %room.id, %game_type, players = players.len(), "match formed");
        Some(MatchOutcome {
            room_id: room.id,
            game_type,
            players,
            dropped,
        })
    }

    /// Starts the periodic scanner. Abort the handle to stop it.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.scan_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            info!(interval_ms = self.config.scan_interval_ms, "matchmaker started");

            loop {
                interval.tick().await;
                let outcomes = self.scan().await;
                if !outcomes.is_empty() {
                    debug!(matches = outcomes.len(), "scan finished");
                }
            }
        })
    }
}
