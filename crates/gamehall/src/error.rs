//! Unified error type for the Gamehall facade.

use gamehall_engine::EngineError;
use gamehall_matchmaking::MatchmakingError;
use gamehall_protocol::ProtocolError;
use gamehall_room::RoomError;
use gamehall_session::SessionError;

/// Top-level error that wraps every crate-specific error.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum GamehallError {
    /// Bytes that don't decode to a client message.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Connection bookkeeping (already connected, expired, unknown).
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Matchmaking(#[from] MatchmakingError),

    /// Malformed TOML configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GamehallError {
    /// HTTP-style status code for the `ERROR` reply.
    pub fn code(&self) -> u16 {
        match self {
            Self::Protocol(_) | Self::Engine(_) => 400,
            Self::Session(SessionError::NotFound(_)) => 404,
            Self::Session(SessionError::AlreadyConnected(_)) => 409,
            Self::Session(SessionError::SessionExpired(_)) => 410,
            Self::Room(e) => e.code(),
            Self::Matchmaking(e) => e.code(),
            Self::Config(_) | Self::Io(_) => 500,
        }
    }
}
