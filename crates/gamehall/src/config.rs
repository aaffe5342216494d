//! Server configuration, loadable from TOML.
//!
//! ```toml
//! log_level = "debug"
//! expiry_sweep_ms = 500
//!
//! [session]
//! reconnect_grace_secs = 30
//!
//! [game.tick]
//! tick_rate_hz = 20
//!
//! [matchmaking]
//! scan_interval_ms = 2000
//!
//! [entry_fees]
//! BINGO = 25
//! ```
//!
//! Every field is optional; missing ones take their defaults.

use std::collections::BTreeMap;
use std::path::Path;

use gamehall_matchmaking::MatchmakingConfig;
use gamehall_protocol::GameType;
use gamehall_room::GameSessionConfig;
use gamehall_session::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::GamehallError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Fallback filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// How often disconnected sessions are checked for expiry.
    pub expiry_sweep_ms: u64,
    pub session: SessionConfig,
    pub game: GameSessionConfig,
    pub matchmaking: MatchmakingConfig,
    /// Overrides for the entry-fee table, by game type.
    pub entry_fees: BTreeMap<String, i64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            expiry_sweep_ms: 1_000,
            session: SessionConfig::default(),
            game: GameSessionConfig::default(),
            matchmaking: MatchmakingConfig::default(),
            entry_fees: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    /// # Errors
    /// [`GamehallError::Config`] on malformed TOML or mistyped fields.
    pub fn from_toml_str(source: &str) -> Result<Self, GamehallError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    /// [`GamehallError::Io`] if the file can't be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GamehallError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub(crate) fn fee_overrides(&self) -> impl Iterator<Item = (GameType, i64)> + '_ {
        self.entry_fees
            .iter()
            .map(|(game_type, fee)| (GameType::new(game_type.as_str()), *fee))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.session.reconnect_grace_secs, 10);
        assert_eq!(config.game.tick.tick_rate_hz, 20);
        assert_eq!(config.matchmaking.scan_interval_ms, 2_000);
        assert!(config.entry_fees.is_empty());
    }

    #[test]
    fn test_from_toml_str_partial() {
        let config = ServerConfig::from_toml_str(
            r#"
            log_level = "debug"

            [session]
            reconnect_grace_secs = 30

            [game.tick]
            tick_rate_hz = 10

            [entry_fees]
            BINGO = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.session.reconnect_grace_secs, 30);
        assert_eq!(config.game.tick.tick_rate_hz, 10);
        assert_eq!(config.matchmaking.scan_interval_ms, 2_000);
        assert_eq!(config.entry_fees.get("BINGO"), Some(&25));
    }

    #[test]
    fn test_from_toml_str_rejects_wrong_types() {
        let result = ServerConfig::from_toml_str("expiry_sweep_ms = \"soon\"");
        assert!(matches!(result, Err(GamehallError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = ServerConfig::load("/nonexistent/gamehall.toml");
        assert!(matches!(result, Err(GamehallError::Io(_))));
    }
}
