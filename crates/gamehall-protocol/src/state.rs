//! Game state values.
//!
//! A [`GameState`] is treated as an immutable snapshot: engines take a
//! reference and hand back a new value, and the state store swaps whole
//! values in and out. Nothing here mutates a snapshot that has already
//! been published.
//!
//! Rule-specific fields (a Bingo board, a NumberGuess secret) live in
//! [`Extensions`], a key → [`ExtValue`] map owned by the engine. Generic
//! code copies extension maps around but never looks inside them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{GameType, PlayerId, RoomId};

/// Default per-game timeout budget, exposed for engines to consult.
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Phase of a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Waiting,
    InProgress,
    GameOver,
}

// ---------------------------------------------------------------------------
// Extension values
// ---------------------------------------------------------------------------

/// A tagged value stored in an engine-private extension map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExtValue {
    Int(i64),
    Ints(Vec<i64>),
    Text(String),
    Texts(Vec<String>),
    Flag(bool),
    Player(PlayerId),
}

/// Engine-private key → value map.
///
/// Typed getters return `None` both when the key is missing and when it
/// holds a different kind of value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(BTreeMap<String, ExtValue>);

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ExtValue> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: ExtValue) {
        self.0.insert(key.into(), value);
    }

    /// Builder-style `set`.
    pub fn with(mut self, key: impl Into<String>, value: ExtValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<ExtValue> {
        self.0.remove(key)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(ExtValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn ints(&self, key: &str) -> Option<&[i64]> {
        match self.0.get(key) {
            Some(ExtValue::Ints(v)) => Some(v),
            _ => None,
        }
    }

    pub fn texts(&self, key: &str) -> Option<&[String]> {
        match self.0.get(key) {
            Some(ExtValue::Texts(v)) => Some(v),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(ExtValue::Flag(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn player(&self, key: &str) -> Option<PlayerId> {
        match self.0.get(key) {
            Some(ExtValue::Player(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Per-player state
// ---------------------------------------------------------------------------

/// One player's slice of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGameState {
    pub player_id: PlayerId,
    pub score: i64,
    /// Presence flag; cleared while the player's connection is down.
    pub alive: bool,
    pub ready: bool,
    pub ext: Extensions,
}

impl PlayerGameState {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            score: 0,
            alive: true,
            ready: false,
            ext: Extensions::new(),
        }
    }

    pub fn with_ext(mut self, ext: Extensions) -> Self {
        self.ext = ext;
        self
    }
}

// ---------------------------------------------------------------------------
// Game state
// ---------------------------------------------------------------------------

/// Snapshot of a running game.
///
/// `turn_order` is a permutation of the registered players and
/// `current_turn_index` always indexes into it modulo its length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub room_id: RoomId,
    pub game_type: GameType,
    pub players: BTreeMap<PlayerId, PlayerGameState>,
    pub phase: GamePhase,
    pub turn_order: Vec<PlayerId>,
    pub current_turn_index: usize,
    pub tick_count: u64,
    pub elapsed_ms: u64,
    pub timeout_ms: u64,
    pub ext: Extensions,
}

impl GameState {
    /// A fresh in-progress state with no room assigned yet.
    pub fn new(
        game_type: GameType,
        players: BTreeMap<PlayerId, PlayerGameState>,
        turn_order: Vec<PlayerId>,
    ) -> Self {
        Self {
            room_id: RoomId(0),
            game_type,
            players,
            phase: GamePhase::InProgress,
            turn_order,
            current_turn_index: 0,
            tick_count: 0,
            elapsed_ms: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            ext: Extensions::new(),
        }
    }

    /// The player whose event is currently valid to apply.
    pub fn current_player(&self) -> Option<PlayerId> {
        if self.turn_order.is_empty() {
            return None;
        }
        self.turn_order
            .get(self.current_turn_index % self.turn_order.len())
            .copied()
    }

    /// Turn index after advancing exactly one position.
    pub fn next_turn_index(&self) -> usize {
        match self.turn_order.len() {
            0 => 0,
            n => (self.current_turn_index + 1) % n,
        }
    }

    /// If the turn holder is not alive, the index of the next alive player
    /// in turn order. `None` when the holder is alive or nobody else is.
    pub fn next_present_turn_index(&self) -> Option<usize> {
        let n = self.turn_order.len();
        let holder = self.current_player()?;
        if self.players.get(&holder).is_none_or(|p| p.alive) {
            return None;
        }
        (1..n)
            .map(|step| (self.current_turn_index + step) % n)
            .find(|&i| {
                self.players
                    .get(&self.turn_order[i])
                    .is_some_and(|p| p.alive)
            })
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }
}
