//! Error types for matchmaking.

use gamehall_engine::EngineError;
use gamehall_protocol::{PlayerId, RoomId};

#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error(transparent)]
    UnknownGameType(#[from] EngineError),

    /// Players already seated in a room can't queue.
    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    #[error("player {0} is not queued")]
    NotQueued(PlayerId),
}

impl MatchmakingError {
    /// HTTP-style status code sent to clients.
    pub fn code(&self) -> u16 {
        match self {
            Self::UnknownGameType(_) => 400,
            Self::AlreadyInRoom(..) => 409,
            Self::NotQueued(_) => 404,
        }
    }
}
