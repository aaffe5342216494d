//! Lobby-facing value types: room lifecycle, room listings, and player
//! profiles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{GameType, PlayerGameState, PlayerId, RoomId};

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// Transitions are strictly ordered, no skipping:
///
/// ```text
/// Waiting → InGame → Finished
/// ```
///
/// - **Waiting**: accepting joins, not started.
/// - **InGame**: a game session is running. No joins.
/// - **Finished**: the game reached a result. The room lingers until its
///   last member leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomState {
    Waiting,
    InGame,
    Finished,
}

impl RoomState {
    /// Returns `true` if the room is accepting new players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns the next state, or `None` from the terminal state.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::InGame),
            Self::InGame => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::InGame => write!(f, "IN_GAME"),
            Self::Finished => write!(f, "FINISHED"),
        }
    }
}

/// A room as shown in lobby listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub game_type: GameType,
    pub max_players: usize,
    pub current_players: usize,
    pub is_private: bool,
    pub state: RoomState,
    pub host_id: PlayerId,
    pub entry_fee: i64,
}

// ---------------------------------------------------------------------------
// Player profiles
// ---------------------------------------------------------------------------

/// A player profile as held by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub coins: i64,
    pub xp: i64,
    pub level: u32,
    pub elo: i64,
    pub games_played: u64,
    pub wins: u64,
}

impl Player {
    /// A fresh profile with the given starting balance.
    pub fn new(id: PlayerId, username: impl Into<String>, coins: i64) -> Self {
        Self {
            id,
            username: username.into(),
            coins,
            xp: 0,
            level: 1,
            elo: 1000,
            games_played: 0,
            wins: 0,
        }
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id,
            username: self.username.clone(),
            level: self.level,
        }
    }
}

/// The public slice of a profile shown to other room members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub username: String,
    pub level: u32,
}

/// What one player is told when a game starts: the shared turn order plus
/// only their own per-player state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartView {
    pub room_id: RoomId,
    pub game_type: GameType,
    pub turn_order: Vec<PlayerId>,
    pub current_turn_index: usize,
    pub you: PlayerGameState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_state_next_follows_strict_order() {
        assert_eq!(RoomState::Waiting.next(), Some(RoomState::InGame));
        assert_eq!(RoomState::InGame.next(), Some(RoomState::Finished));
        assert_eq!(RoomState::Finished.next(), None);
    }

    #[test]
    fn test_room_state_can_transition_to() {
        assert!(RoomState::Waiting.can_transition_to(RoomState::InGame));
        assert!(!RoomState::Waiting.can_transition_to(RoomState::Finished));
        assert!(!RoomState::Finished.can_transition_to(RoomState::Waiting));
    }

    #[test]
    fn test_room_state_is_joinable() {
        assert!(RoomState::Waiting.is_joinable());
        assert!(!RoomState::InGame.is_joinable());
        assert!(!RoomState::Finished.is_joinable());
    }

    #[test]
    fn test_room_state_display_matches_wire() {
        assert_eq!(RoomState::InGame.to_string(), "IN_GAME");
        assert_eq!(
            serde_json::to_string(&RoomState::InGame).unwrap(),
            "\"IN_GAME\""
        );
    }

    #[test]
    fn test_player_summary_hides_balance() {
        let player = Player::new(PlayerId(5), "ada", 250);
        let json = serde_json::to_value(player.summary()).unwrap();
        assert_eq!(json["username"], "ada");
        assert!(json.get("coins").is_none());
    }
}
