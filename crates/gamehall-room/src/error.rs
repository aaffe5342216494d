//! Error types for the room layer.

use gamehall_engine::EngineError;
use gamehall_protocol::{PlayerId, RoomId, RoomState};

use crate::CollaboratorError;

/// Room-operation failures. Every variant leaves rooms, membership and
/// balances exactly as they were before the call.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomId),

    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("wrong password for room {0}")]
    WrongPassword(RoomId),

    #[error("player {player} cannot pay the entry fee of {fee}")]
    InsufficientFunds { player: PlayerId, fee: i64 },

    #[error("player {0} is not the host of room {1}")]
    NotHost(PlayerId, RoomId),

    /// The room is in a lifecycle state that doesn't allow this operation.
    #[error("room {0} is {1}")]
    InvalidState(RoomId, RoomState),

    /// A player can be in at most one room at a time.
    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    #[error("need {needed} players to start, have {have}")]
    NotEnoughPlayers { needed: usize, have: usize },

    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("invalid room settings: {0}")]
    InvalidSpec(String),

    /// Unknown game type at engine lookup.
    #[error(transparent)]
    Config(#[from] EngineError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// No game is running in the room (not started, or already over).
    #[error("no game running in room {0}")]
    SessionStopped(RoomId),

    /// Opcodes below 10 are for the server only.
    #[error("opcode {0} is reserved")]
    ReservedOpcode(i32),
}

impl RoomError {
    /// HTTP-style status code sent to clients.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::UnknownPlayer(_) => 404,
            Self::WrongPassword(_) | Self::NotHost(..) => 403,
            Self::InsufficientFunds { .. } => 402,
            Self::RoomFull(_)
            | Self::InvalidState(..)
            | Self::AlreadyInRoom(..)
            | Self::NotEnoughPlayers { .. }
            | Self::SessionStopped(_) => 409,
            Self::NotInRoom(_)
            | Self::InvalidSpec(_)
            | Self::ReservedOpcode(_)
            | Self::Config(EngineError::UnknownGameType(_)) => 400,
            Self::Config(EngineError::DuplicateGameType(_)) | Self::Collaborator(_) => 500,
        }
    }
}
