//! Session types: the server's record of one player's connection.

use gamehall_protocol::{PlayerId, ServerMessage};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a disconnected player has to come back before the session
    /// expires and they are removed from their room.
    ///
    /// Default: 10 seconds. 0 expires on the next sweep.
    pub reconnect_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Connection state machine:
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(grace elapsed)──→ Expired
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    /// Lost the connection at `since`; may come back within the grace
    /// period.
    Disconnected { since: Instant },
    /// Grace period elapsed. Waiting for cleanup.
    Expired,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Session {
    pub player_id: PlayerId,
    pub state: SessionState,
    /// Outbound queue to the transport. `None` unless connected.
    pub(crate) outbound: Option<UnboundedSender<ServerMessage>>,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected)
    }
}
