//! Identity types shared by every layer.
//!
//! Players and rooms are identified by newtype wrappers around `u64` so a
//! `RoomId` can never be passed where a `PlayerId` is expected. Game types
//! are string keys ("BINGO", "NUMBER_GUESS") chosen by the engine that
//! registers them.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for a player.
///
/// `#[serde(transparent)]` keeps the wire form a bare number: `PlayerId(42)`
/// serializes as `42`, not `{ "0": 42 }`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// Sender id used for events the server emits on its own behalf
    /// (game over, presence changes).
    pub const SERVER: PlayerId = PlayerId(0);

    /// Returns `true` for the reserved server sender.
    pub fn is_server(&self) -> bool {
        *self == Self::SERVER
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// The key a game-rule engine is registered under.
///
/// Implements `Borrow<str>` so maps keyed by `GameType` can be queried
/// with a plain `&str` straight off the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameType(String);

impl GameType {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for GameType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GameType {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_ids_display_with_prefix() {
        assert_eq!(PlayerId(42).to_string(), "P-42");
        assert_eq!(RoomId(7).to_string(), "R-7");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        assert_eq!(serde_json::to_string(&PlayerId(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&GameType::new("BINGO")).unwrap(),
            "\"BINGO\""
        );
    }

    #[test]
    fn test_game_type_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(GameType::new("BINGO"), 1);
        assert_eq!(map.get("BINGO"), Some(&1));
        assert_eq!(map.get("CHESS"), None);
    }

    #[test]
    fn test_server_sender() {
        assert!(PlayerId::SERVER.is_server());
        assert!(!PlayerId(1).is_server());
    }
}
