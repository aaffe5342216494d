//! Room and game-session settings.

use gamehall_engine::EngineOptions;
use gamehall_protocol::GameType;
use gamehall_tick::TickConfig;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameSessionConfig
// ---------------------------------------------------------------------------

/// Settings shared by every game session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSessionConfig {
    /// Tick loop settings. 20 Hz unless overridden.
    pub tick: TickConfig,
}

// ---------------------------------------------------------------------------
// RoomSpec
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_PLAYERS: usize = 4;

/// What a host asks for when creating a room.
///
/// ```
/// use gamehall_room::RoomSpec;
///
/// let spec = RoomSpec::new("friday night", "BINGO")
///     .max_players(2)
///     .password("hunter2")
///     .option("maxAttempts", "5");
/// assert!(spec.is_private);
/// assert_eq!(spec.max_players, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSpec {
    pub name: String,
    pub game_type: GameType,
    pub max_players: usize,
    pub is_private: bool,
    pub password: Option<String>,
    pub options: EngineOptions,
}

impl RoomSpec {
    pub fn new(name: impl Into<String>, game_type: impl Into<GameType>) -> Self {
        Self {
            name: name.into(),
            game_type: game_type.into(),
            max_players: DEFAULT_MAX_PLAYERS,
            is_private: false,
            password: None,
            options: EngineOptions::new(),
        }
    }

    pub fn max_players(mut self, max_players: usize) -> Self {
        self.max_players = max_players;
        self
    }

    /// Makes the room private, guarded by `password`.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.is_private = true;
        self.password = Some(password.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_spec_defaults() {
        let spec = RoomSpec::new("lobby", "NUMBER_GUESS");
        assert_eq!(spec.max_players, DEFAULT_MAX_PLAYERS);
        assert!(!spec.is_private);
        assert!(spec.password.is_none());
        assert!(spec.options.is_empty());
    }

    #[test]
    fn test_game_session_config_defaults_to_20hz() {
        let config = GameSessionConfig::default();
        assert_eq!(config.tick.tick_rate_hz, 20);
    }
}
