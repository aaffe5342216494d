//! Error types for the engine layer.

use gamehall_protocol::{GameType, PlayerId};

/// Registry misconfiguration. Only possible before startup completes, or
/// when a client names a game type nobody registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("no engine registered for game type {0}")]
    UnknownGameType(String),

    #[error("game type {0} registered twice")]
    DuplicateGameType(GameType),
}

/// A rejected player event. Reported to the sender only; the state and
/// the turn are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("invalid opcode {0}")]
    InvalidOpcode(i32),

    #[error("not your turn")]
    NotYourTurn,

    #[error("missing or malformed field `{0}`")]
    MissingField(&'static str),

    #[error("`{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("number {0} was already called")]
    AlreadyCalled(i64),

    #[error("{0} is not part of this game")]
    UnknownPlayer(PlayerId),
}
