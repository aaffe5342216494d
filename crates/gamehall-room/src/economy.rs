//! [`LedgerEconomy`]: an [`Economy`] backed by any [`Persistence`].
//!
//! Every coin movement is an `adjust_coins` followed by a ledger row.
//! `adjust_coins` refuses overdrafts, so a failed debit never leaves a
//! partial change behind.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use gamehall_protocol::{GameResult, GameType, PlayerId, RoomId};
use tracing::{debug, info, warn};

use crate::{
    CoinTransaction, CollaboratorError, Economy, Persistence, StatsDelta, TransactionReason,
};

pub const ELO_WIN: i64 = 25;
pub const ELO_LOSS: i64 = -15;

/// XP required for levels 1 through 5. Past the last threshold every 500 xp
/// is one more level.
const LEVEL_THRESHOLDS: [i64; 5] = [0, 100, 300, 600, 1000];
const XP_PER_LEVEL_AFTER: i64 = 500;

/// Level for a total xp amount.
///
/// ```
/// use gamehall_room::economy::level_for_xp;
/// assert_eq!(level_for_xp(0), 1);
/// assert_eq!(level_for_xp(299), 2);
/// assert_eq!(level_for_xp(1500), 6);
/// ```
pub fn level_for_xp(xp: i64) -> u32 {
    let below = LEVEL_THRESHOLDS.iter().filter(|&&t| xp >= t).count() as u32;
    let last = LEVEL_THRESHOLDS[LEVEL_THRESHOLDS.len() - 1];
    if xp < last {
        return below.max(1);
    }
    below + ((xp - last) / XP_PER_LEVEL_AFTER) as u32
}

pub struct LedgerEconomy<P> {
    persistence: Arc<P>,
    fees: HashMap<GameType, i64>,
}

impl<P: Persistence> LedgerEconomy<P> {
    /// Default fee table: BINGO costs 10 coins, NUMBER_GUESS is free.
    pub fn new(persistence: Arc<P>) -> Self {
        let fees = HashMap::from([
            (GameType::new("BINGO"), 10),
            (GameType::new("NUMBER_GUESS"), 0),
        ]);
        Self { persistence, fees }
    }

    /// Overrides (or adds) the fee for one game type.
    pub fn with_fee(mut self, game_type: impl Into<GameType>, fee: i64) -> Self {
        self.fees.insert(game_type.into(), fee.max(0));
        self
    }

    pub fn with_fees(mut self, fees: impl IntoIterator<Item = (GameType, i64)>) -> Self {
        for (game_type, fee) in fees {
            self.fees.insert(game_type, fee.max(0));
        }
        self
    }

    pub fn persistence(&self) -> &Arc<P> {
        &self.persistence
    }

    async fn move_coins(
        &self,
        player: PlayerId,
        delta: i64,
        reason: TransactionReason,
        room_id: RoomId,
    ) -> Result<i64, CollaboratorError> {
        let balance_after = self.persistence.adjust_coins(player, delta).await?;
        self.persistence
            .record_transaction(CoinTransaction {
                player_id: player,
                delta,
                reason,
                balance_after,
                room_id: Some(room_id),
            })
            .await?;
        Ok(balance_after)
    }
}

impl<P: Persistence> Economy for LedgerEconomy<P> {
    fn entry_fee(&self, game_type: &GameType) -> i64 {
        self.fees.get(game_type).copied().unwrap_or(0)
    }

    async fn deduct_entry_fee(
        &self,
        player: PlayerId,
        game_type: &GameType,
        room_id: RoomId,
    ) -> Result<(), CollaboratorError> {
        let fee = self.entry_fee(game_type);
        if fee == 0 {
            return Ok(());
        }
        let balance = self
            .move_coins(player, -fee, TransactionReason::EntryFee, room_id)
            .await?;
        debug!(%player, %room_id, fee, balance, "entry fee deducted");
        Ok(())
    }

    async fn refund_entry_fee(
        &self,
        player: PlayerId,
        game_type: &GameType,
        room_id: RoomId,
    ) -> Result<(), CollaboratorError> {
        let fee = self.entry_fee(game_type);
        if fee == 0 {
            return Ok(());
        }
        self.move_coins(player, fee, TransactionReason::EntryFeeRefund, room_id)
            .await?;
        debug!(%player, %room_id, fee, "entry fee refunded");
        Ok(())
    }

    async fn apply_game_result(
        &self,
        room_id: RoomId,
        result: &GameResult,
    ) -> Result<(), CollaboratorError> {
        let participants: BTreeSet<PlayerId> = result
            .coin_deltas
            .keys()
            .chain(result.xp_deltas.keys())
            .copied()
            .collect();

        for player in participants {
            let won = result.is_winner(player);

            let coins = result.coin_delta(player);
            if coins != 0 {
                let reason = if won {
                    TransactionReason::GameWin
                } else {
                    TransactionReason::GameLoss
                };
                match self.move_coins(player, coins, reason, room_id).await {
                    Ok(_) => {}
                    Err(CollaboratorError::InsufficientFunds { balance, .. }) => {
                        warn!(%player, %room_id, coins, balance, "skipping payout that would overdraw");
                    }
                    Err(e) => return Err(e),
                }
            }

            let profile = self
                .persistence
                .find_player(player)
                .await?
                .ok_or(CollaboratorError::PlayerNotFound(player))?;
            let xp = result.xp_delta(player);
            let delta = StatsDelta {
                xp,
                elo: if won { ELO_WIN } else { ELO_LOSS },
                games_played: 1,
                wins: u64::from(won),
                level: level_for_xp(profile.xp + xp),
            };
            let updated = self.persistence.record_stats(player, delta).await?;
            if updated.level > profile.level {
                info!(%player, level = updated.level, "player levelled up");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryPersistence;
    use gamehall_protocol::{Player, RankedPlayer};

    fn economy(players: &[(u64, i64)]) -> (LedgerEconomy<MemoryPersistence>, Arc<MemoryPersistence>) {
        let store = Arc::new(MemoryPersistence::new());
        for &(id, coins) in players {
            store.insert_player(Player::new(PlayerId(id), format!("p{id}"), coins));
        }
        (LedgerEconomy::new(store.clone()), store)
    }

    fn bingo() -> GameType {
        GameType::new("BINGO")
    }

    #[test]
    fn test_level_for_xp_thresholds() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(600), 4);
        assert_eq!(level_for_xp(1000), 5);
        assert_eq!(level_for_xp(1499), 5);
        assert_eq!(level_for_xp(2000), 7);
    }

    #[test]
    fn test_fee_table_defaults_and_overrides() {
        let (eco, _) = economy(&[]);
        assert_eq!(eco.entry_fee(&bingo()), 10);
        assert_eq!(eco.entry_fee(&GameType::new("NUMBER_GUESS")), 0);
        assert_eq!(eco.entry_fee(&GameType::new("UNLISTED")), 0);

        let eco = eco.with_fee("BINGO", 25);
        assert_eq!(eco.entry_fee(&bingo()), 25);
    }

    #[tokio::test]
    async fn test_deduct_entry_fee_insufficient_changes_nothing() {
        let (eco, store) = economy(&[(1, 5)]);

        let result = eco.deduct_entry_fee(PlayerId(1), &bingo(), RoomId(1)).await;

        assert!(matches!(
            result,
            Err(CollaboratorError::InsufficientFunds { balance: 5, delta: -10, .. })
        ));
        assert_eq!(store.player(PlayerId(1)).unwrap().coins, 5);
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_deduct_then_refund_restores_balance() {
        let (eco, store) = economy(&[(1, 50)]);

        eco.deduct_entry_fee(PlayerId(1), &bingo(), RoomId(1)).await.unwrap();
        assert_eq!(store.player(PlayerId(1)).unwrap().coins, 40);

        eco.refund_entry_fee(PlayerId(1), &bingo(), RoomId(1)).await.unwrap();
        assert_eq!(store.player(PlayerId(1)).unwrap().coins, 50);

        let reasons: Vec<_> = store.transactions().iter().map(|t| t.reason).collect();
        assert_eq!(
            reasons,
            vec![TransactionReason::EntryFee, TransactionReason::EntryFeeRefund]
        );
    }

    #[tokio::test]
    async fn test_free_game_records_no_transaction() {
        let (eco, store) = economy(&[(1, 0)]);
        eco.deduct_entry_fee(PlayerId(1), &GameType::new("NUMBER_GUESS"), RoomId(1))
            .await
            .unwrap();
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_apply_game_result_pays_out_and_updates_stats() {
        let (eco, store) = economy(&[(1, 100), (2, 100)]);
        let mut result = GameResult {
            winner_ids: vec![PlayerId(1)],
            loser_ids: vec![PlayerId(2)],
            rankings: vec![
                RankedPlayer { player_id: PlayerId(1), rank: 1, score: 0 },
                RankedPlayer { player_id: PlayerId(2), rank: 2, score: 0 },
            ],
            ..Default::default()
        };
        result.coin_deltas.insert(PlayerId(1), 100);
        result.coin_deltas.insert(PlayerId(2), -20);
        result.xp_deltas.insert(PlayerId(1), 150);
        result.xp_deltas.insert(PlayerId(2), 10);

        eco.apply_game_result(RoomId(1), &result).await.unwrap();

        let winner = store.player(PlayerId(1)).unwrap();
        assert_eq!(winner.coins, 200);
        assert_eq!(winner.xp, 150);
        assert_eq!(winner.level, 2);
        assert_eq!(winner.elo, 1025);
        assert_eq!((winner.games_played, winner.wins), (1, 1));

        let loser = store.player(PlayerId(2)).unwrap();
        assert_eq!(loser.coins, 80);
        assert_eq!(loser.elo, 985);
        assert_eq!((loser.games_played, loser.wins), (1, 0));
    }

    #[tokio::test]
    async fn test_apply_game_result_skips_overdraw() {
        let (eco, store) = economy(&[(1, 5)]);
        let mut result = GameResult {
            loser_ids: vec![PlayerId(1)],
            ..Default::default()
        };
        result.coin_deltas.insert(PlayerId(1), -20);
        result.xp_deltas.insert(PlayerId(1), 10);

        eco.apply_game_result(RoomId(1), &result).await.unwrap();

        let player = store.player(PlayerId(1)).unwrap();
        assert_eq!(player.coins, 5);
        assert_eq!(player.xp, 10);
        assert!(store.transactions().is_empty());
    }
}
