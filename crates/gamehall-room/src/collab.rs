//! Collaborator contracts: persistence and economy.
//!
//! The room layer never stores players or ledgers itself. It talks to
//! whatever implements [`Persistence`] and [`Economy`]. Both traits are
//! async and `Send + Sync + 'static` so a single instance can be shared by
//! every room and session task.

use std::future::Future;

use gamehall_protocol::{GameResult, GameType, Player, PlayerId, RoomId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionReason {
    EntryFee,
    EntryFeeRefund,
    GameWin,
    GameLoss,
}

/// One row of the append-only coin ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinTransaction {
    pub player_id: PlayerId,
    pub delta: i64,
    pub reason: TransactionReason,
    pub balance_after: i64,
    pub room_id: Option<RoomId>,
}

/// Stat changes applied after a game. `level` is absolute, the rest are
/// deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDelta {
    pub xp: i64,
    pub elo: i64,
    pub games_played: u64,
    pub wins: u64,
    pub level: u32,
}

/// One row of the append-only game-result ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub room_id: RoomId,
    pub game_type: GameType,
    pub result: GameResult,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The adjustment would take the balance below zero. Nothing changed.
    #[error("player {player} has {balance} coins, cannot apply {delta}")]
    InsufficientFunds {
        player: PlayerId,
        balance: i64,
        delta: i64,
    },

    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    #[error("storage failure: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Player, ledger and game-result storage.
pub trait Persistence: Send + Sync + 'static {
    fn find_player(
        &self,
        id: PlayerId,
    ) -> impl Future<Output = Result<Option<Player>, CollaboratorError>> + Send;

    /// Adds `delta` to the balance and returns the new balance.
    ///
    /// # Errors
    /// `InsufficientFunds` if the result would be negative; the balance
    /// is left unchanged.
    fn adjust_coins(
        &self,
        id: PlayerId,
        delta: i64,
    ) -> impl Future<Output = Result<i64, CollaboratorError>> + Send;

    fn record_transaction(
        &self,
        transaction: CoinTransaction,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;

    /// Applies `delta` and returns the updated profile.
    fn record_stats(
        &self,
        id: PlayerId,
        delta: StatsDelta,
    ) -> impl Future<Output = Result<Player, CollaboratorError>> + Send;

    fn save_game_result(
        &self,
        record: GameRecord,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;
}

/// Entry fees and rewards.
pub trait Economy: Send + Sync + 'static {
    /// Entry fee for a game type. 0 means free.
    fn entry_fee(&self, game_type: &GameType) -> i64;

    /// Debits the entry fee. Either the whole fee is taken and recorded,
    /// or nothing changes.
    ///
    /// # Errors
    /// `InsufficientFunds` if the player cannot pay.
    fn deduct_entry_fee(
        &self,
        player: PlayerId,
        game_type: &GameType,
        room_id: RoomId,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;

    /// Credits back a fee taken by `deduct_entry_fee` for a join that could
    /// not be completed.
    fn refund_entry_fee(
        &self,
        player: PlayerId,
        game_type: &GameType,
        room_id: RoomId,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;

    /// Applies every coin and xp delta in `result`, plus stat bookkeeping.
    fn apply_game_result(
        &self,
        room_id: RoomId,
        result: &GameResult,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;
}
