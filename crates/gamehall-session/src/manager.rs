//! The session manager: every connected (or recently disconnected) player.
//!
//! Responsibilities:
//! - Hand each connecting player an outbound message queue
//! - Track Connected / Disconnected / Expired per player
//! - Expire sessions whose grace period elapsed
//! - Deliver messages: [`SessionManager::send_to_player`] is
//!   fire-and-forget and drops silently when nobody is listening
//!
//! # Concurrency
//!
//! Shared by network handlers, every game session and the expiry sweep,
//! so sessions live in a `DashMap`. Each operation is a single
//! `entry` / `get_mut` / `retain` call; no guard escapes a method.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use gamehall_protocol::{PlayerId, ServerMessage};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{Session, SessionConfig, SessionError, SessionState};

/// Connection registry.
///
/// ## Lifecycle
///
/// ```text
/// connect() ──→ disconnect() ──→ reconnect()
///     │               │                │
///     ▼               ▼                ▼
/// [Connected]   [Disconnected]   [Connected]
///                     │
///                     ▼ expire_stale() after grace period
///                 [Expired] ──→ cleanup_expired()
/// ```
pub struct SessionManager {
    sessions: DashMap<PlayerId, Session>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    fn grace(&self) -> Duration {
        Duration::from_secs(self.config.reconnect_grace_secs)
    }

    /// Opens a fresh session and returns the receiving end of the player's
    /// outbound queue. A previous disconnected or expired session for the
    /// same player is replaced.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the player is connected.
    pub fn connect(
        &self,
        player_id: PlayerId,
    ) -> Result<UnboundedReceiver<ServerMessage>, SessionError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session {
            player_id,
            state: SessionState::Connected,
            outbound: Some(tx),
        };

        match self.sessions.entry(player_id) {
            Entry::Occupied(mut existing) => {
                if existing.get().is_connected() {
                    return Err(SessionError::AlreadyConnected(player_id));
                }
                existing.insert(session);
            }
            Entry::Vacant(slot) => {
                slot.insert(session);
            }
        }

        info!(%player_id, "session created");
        Ok(rx)
    }

    /// Marks a player disconnected and starts the grace period. Messages
    /// sent while disconnected are dropped.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no session exists.
    pub fn disconnect(&self, player_id: PlayerId) -> Result<(), SessionError> {
        let mut session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        session.state = SessionState::Disconnected {
            since: Instant::now(),
        };
        session.outbound = None;

        info!(%player_id, grace_secs = self.config.reconnect_grace_secs, "player disconnected, grace period started");
        Ok(())
    }

    /// Restores a disconnected session within its grace period and returns
    /// a new outbound queue.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: no session
    /// - [`SessionError::SessionExpired`]: grace period elapsed
    /// - [`SessionError::AlreadyConnected`]: never disconnected
    pub fn reconnect(
        &self,
        player_id: PlayerId,
    ) -> Result<UnboundedReceiver<ServerMessage>, SessionError> {
        let grace = self.grace();
        let mut session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        match session.state {
            SessionState::Disconnected { since } => {
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    return Err(SessionError::SessionExpired(player_id));
                }
                let (tx, rx) = mpsc::unbounded_channel();
                session.state = SessionState::Connected;
                session.outbound = Some(tx);
                info!(%player_id, "player reconnected");
                Ok(rx)
            }
            SessionState::Connected => Err(SessionError::AlreadyConnected(player_id)),
            SessionState::Expired => Err(SessionError::SessionExpired(player_id)),
        }
    }

    /// Expires every disconnected session past the grace period and returns
    /// the affected players. Run periodically.
    pub fn expire_stale(&self) -> Vec<PlayerId> {
        let grace = self.grace();
        let mut expired = Vec::new();

        for mut session in self.sessions.iter_mut() {
            if let SessionState::Disconnected { since } = session.state {
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    expired.push(session.player_id);
                    info!(
                        player_id = %session.player_id,
                        "session expired (grace period elapsed)"
                    );
                }
            }
        }

        expired
    }

    /// Drops expired sessions. Kept separate from `expire_stale` so the
    /// caller can react to expirations first.
    pub fn cleanup_expired(&self) {
        self.sessions
            .retain(|_, session| !matches!(session.state, SessionState::Expired));
    }

    /// Queues `message` for the player. Returns `false` (and drops the
    /// message) when the player has no live connection.
    pub fn send_to_player(&self, player_id: PlayerId, message: ServerMessage) -> bool {
        let delivered = self
            .sessions
            .get(&player_id)
            .and_then(|s| s.outbound.as_ref().map(|tx| tx.send(message).is_ok()))
            .unwrap_or(false);
        if !delivered {
            debug!(%player_id, "dropping message for offline player");
        }
        delivered
    }

    pub fn is_connected(&self, player_id: PlayerId) -> bool {
        self.sessions
            .get(&player_id)
            .is_some_and(|s| s.is_connected())
    }

    pub fn state(&self, player_id: PlayerId) -> Option<SessionState> {
        self.sessions.get(&player_id).map(|s| s.state)
    }

    /// Number of sessions in any state.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Time-dependent cases run on a paused tokio clock and move it with
    //! `tokio::time::advance`.

    use super::*;

    fn manager() -> SessionManager {
        SessionManager::default()
    }

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn pong() -> ServerMessage {
        ServerMessage::Pong { request_id: None }
    }

    // =====================================================================
    // connect()
    // =====================================================================

    #[tokio::test]
    async fn test_connect_delivers_messages() {
        let mgr = manager();
        let mut rx = mgr.connect(pid(1)).unwrap();

        assert!(mgr.send_to_player(pid(1), pong()));
        assert_eq!(rx.recv().await, Some(pong()));
        assert!(mgr.is_connected(pid(1)));
    }

    #[test]
    fn test_connect_already_connected_returns_error() {
        let mgr = manager();
        let _rx = mgr.connect(pid(1)).unwrap();

        let result = mgr.connect(pid(1));
        assert!(matches!(result, Err(SessionError::AlreadyConnected(p)) if p == pid(1)));
    }

    #[test]
    fn test_connect_replaces_disconnected_session() {
        let mgr = manager();
        let _rx = mgr.connect(pid(1)).unwrap();
        mgr.disconnect(pid(1)).unwrap();

        assert!(mgr.connect(pid(1)).is_ok());
        assert_eq!(mgr.state(pid(1)), Some(SessionState::Connected));
        assert_eq!(mgr.len(), 1);
    }

    // =====================================================================
    // send_to_player()
    // =====================================================================

    #[test]
    fn test_send_to_unknown_player_is_dropped() {
        let mgr = manager();
        assert!(!mgr.send_to_player(pid(9), pong()));
    }

    #[test]
    fn test_send_while_disconnected_is_dropped() {
        let mgr = manager();
        let _rx = mgr.connect(pid(1)).unwrap();
        mgr.disconnect(pid(1)).unwrap();
        assert!(!mgr.send_to_player(pid(1), pong()));
    }

    #[test]
    fn test_send_after_receiver_dropped_is_dropped() {
        let mgr = manager();
        drop(mgr.connect(pid(1)).unwrap());
        assert!(!mgr.send_to_player(pid(1), pong()));
    }

    // =====================================================================
    // disconnect() / reconnect()
    // =====================================================================

    #[test]
    fn test_disconnect_unknown_player_returns_not_found() {
        let mgr = manager();
        assert!(matches!(
            mgr.disconnect(pid(99)),
            Err(SessionError::NotFound(p)) if p == pid(99)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_within_grace_restores_delivery() {
        let mgr = manager();
        let _old = mgr.connect(pid(1)).unwrap();
        mgr.disconnect(pid(1)).unwrap();
        assert!(!mgr.is_connected(pid(1)));

        tokio::time::advance(Duration::from_secs(9)).await;
        let mut rx = mgr.reconnect(pid(1)).unwrap();

        assert!(mgr.send_to_player(pid(1), pong()));
        assert_eq!(rx.recv().await, Some(pong()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_grace_returns_expired() {
        let mgr = manager();
        let _rx = mgr.connect(pid(1)).unwrap();
        mgr.disconnect(pid(1)).unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        let result = mgr.reconnect(pid(1));

        assert!(matches!(result, Err(SessionError::SessionExpired(p)) if p == pid(1)));
        assert_eq!(mgr.state(pid(1)), Some(SessionState::Expired));
    }

    #[test]
    fn test_reconnect_already_connected_returns_error() {
        let mgr = manager();
        let _rx = mgr.connect(pid(1)).unwrap();
        assert!(matches!(
            mgr.reconnect(pid(1)),
            Err(SessionError::AlreadyConnected(_))
        ));
    }

    // =====================================================================
    // expire_stale() / cleanup_expired()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_expire_stale_only_touches_timed_out_sessions() {
        let mgr = manager();
        let _a = mgr.connect(pid(1)).unwrap();
        let _b = mgr.connect(pid(2)).unwrap();
        let _c = mgr.connect(pid(3)).unwrap();
        mgr.disconnect(pid(1)).unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        mgr.disconnect(pid(3)).unwrap();
        assert!(mgr.expire_stale().is_empty());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(mgr.expire_stale(), vec![pid(1)]);
        assert_eq!(mgr.state(pid(2)), Some(SessionState::Connected));
        assert!(matches!(
            mgr.state(pid(3)),
            Some(SessionState::Disconnected { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired_removes_only_expired() {
        let mgr = manager();
        let _a = mgr.connect(pid(1)).unwrap();
        let _b = mgr.connect(pid(2)).unwrap();
        mgr.disconnect(pid(1)).unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        mgr.expire_stale();
        assert_eq!(mgr.len(), 2);

        mgr.cleanup_expired();

        assert_eq!(mgr.len(), 1);
        assert!(mgr.state(pid(1)).is_none());
        assert!(mgr.is_connected(pid(2)));
        assert!(matches!(
            mgr.reconnect(pid(1)),
            Err(SessionError::NotFound(_))
        ));
    }
}
