//! Final outcome of a game.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Payload, PlayerId};

/// One row of the final standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPlayer {
    pub player_id: PlayerId,
    /// 1 is best. Tied players share a rank.
    pub rank: u32,
    pub score: i64,
}

/// The value an engine returns once a win condition is met.
///
/// `winner_ids` and `loser_ids` are disjoint. Coin and xp deltas are keyed
/// by player and applied by the economy after the game ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub winner_ids: Vec<PlayerId>,
    pub loser_ids: Vec<PlayerId>,
    pub rankings: Vec<RankedPlayer>,
    pub coin_deltas: BTreeMap<PlayerId, i64>,
    pub xp_deltas: BTreeMap<PlayerId, i64>,
    /// Game-specific summary (final secret number, winning lines, ...).
    #[serde(default)]
    pub summary: Payload,
}

impl GameResult {
    pub fn is_winner(&self, player: PlayerId) -> bool {
        self.winner_ids.contains(&player)
    }

    /// Every player mentioned as winner or loser, winners first.
    pub fn participants(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.winner_ids
            .iter()
            .chain(self.loser_ids.iter())
            .copied()
    }

    pub fn coin_delta(&self, player: PlayerId) -> i64 {
        self.coin_deltas.get(&player).copied().unwrap_or(0)
    }

    pub fn xp_delta(&self, player: PlayerId) -> i64 {
        self.xp_deltas.get(&player).copied().unwrap_or(0)
    }
}
