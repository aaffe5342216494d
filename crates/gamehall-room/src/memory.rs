//! In-memory [`Persistence`] for tests, demos and single-process servers.

use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use gamehall_protocol::{Player, PlayerId};

use crate::{CoinTransaction, CollaboratorError, GameRecord, Persistence, StatsDelta};

/// Players live in a `DashMap`; both ledgers are append-only vectors.
#[derive(Default)]
pub struct MemoryPersistence {
    players: DashMap<PlayerId, Player>,
    transactions: Mutex<Vec<CoinTransaction>>,
    records: Mutex<Vec<GameRecord>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a player profile.
    pub fn insert_player(&self, player: Player) {
        self.players.insert(player.id, player);
    }

    pub fn player(&self, id: PlayerId) -> Option<Player> {
        self.players.get(&id).map(|p| p.clone())
    }

    /// Snapshot of the coin ledger, oldest first.
    pub fn transactions(&self) -> Vec<CoinTransaction> {
        self.transactions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of saved game results, oldest first.
    pub fn game_records(&self) -> Vec<GameRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Persistence for MemoryPersistence {
    async fn find_player(&self, id: PlayerId) -> Result<Option<Player>, CollaboratorError> {
        Ok(self.player(id))
    }

    async fn adjust_coins(&self, id: PlayerId, delta: i64) -> Result<i64, CollaboratorError> {
        let mut player = self
            .players
            .get_mut(&id)
            .ok_or(CollaboratorError::PlayerNotFound(id))?;
        let balance = player.coins + delta;
        if balance < 0 {
            return Err(CollaboratorError::InsufficientFunds {
                player: id,
                balance: player.coins,
                delta,
            });
        }
        player.coins = balance;
        Ok(balance)
    }

    async fn record_transaction(
        &self,
        transaction: CoinTransaction,
    ) -> Result<(), CollaboratorError> {
        self.transactions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transaction);
        Ok(())
    }

    async fn record_stats(
        &self,
        id: PlayerId,
        delta: StatsDelta,
    ) -> Result<Player, CollaboratorError> {
        let mut player = self
            .players
            .get_mut(&id)
            .ok_or(CollaboratorError::PlayerNotFound(id))?;
        player.xp += delta.xp;
        player.elo += delta.elo;
        player.games_played += delta.games_played;
        player.wins += delta.wins;
        player.level = delta.level;
        Ok(player.clone())
    }

    async fn save_game_result(&self, record: GameRecord) -> Result<(), CollaboratorError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }
}
