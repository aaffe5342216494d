//! Error types for the session layer.

use gamehall_protocol::PlayerId;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The player was never connected, or the session was cleaned up.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// The reconnection grace period has elapsed.
    #[error("session expired for player {0}")]
    SessionExpired(PlayerId),

    /// A player can only have one live connection at a time.
    #[error("player {0} already has an active session")]
    AlreadyConnected(PlayerId),
}
