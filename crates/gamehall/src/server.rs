//! [`GameHall`] builder and background tasks.
//!
//! The hall ties every layer together: bytes → protocol → connections →
//! rooms and matchmaking. It owns no transport; whatever carries bytes to
//! and from players calls [`connect`](GameHall::connect),
//! [`handle_bytes`](GameHall::handle_bytes) and
//! [`disconnect`](GameHall::disconnect), and forwards the outbound queue
//! returned by `connect`.

use std::sync::Arc;
use std::time::Duration;

use gamehall_engine::EngineRegistry;
use gamehall_matchmaking::Matchmaker;
use gamehall_protocol::{ClientMessage, Codec, JsonCodec, PlayerId, ServerMessage};
use gamehall_room::{Economy, LedgerEconomy, Persistence, RoomRegistry};
use gamehall_session::SessionManager;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{GamehallError, ServerConfig, handler};

/// Builder for a [`GameHall`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use gamehall::prelude::*;
///
/// let hall = GameHall::builder()
///     .config(ServerConfig::default())
///     .build(Arc::new(MemoryPersistence::new()));
/// assert!(hall.rooms().is_empty());
/// ```
pub struct GameHallBuilder {
    config: ServerConfig,
    engines: Option<EngineRegistry>,
}

impl GameHallBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            engines: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the built-in engines (BINGO, NUMBER_GUESS).
    pub fn engines(mut self, engines: EngineRegistry) -> Self {
        self.engines = Some(engines);
        self
    }

    /// Builds a hall that charges fees and settles games through a
    /// [`LedgerEconomy`] over `persistence`, with the configured fee
    /// overrides applied.
    pub fn build<P: Persistence>(self, persistence: Arc<P>) -> GameHall<LedgerEconomy<P>, P> {
        let economy =
            LedgerEconomy::new(persistence.clone()).with_fees(self.config.fee_overrides());
        self.build_with_economy(Arc::new(economy), persistence)
    }

    /// Builds a hall around a custom economy.
    pub fn build_with_economy<E: Economy, P: Persistence>(
        self,
        economy: Arc<E>,
        persistence: Arc<P>,
    ) -> GameHall<E, P> {
        let engines = Arc::new(self.engines.unwrap_or_else(EngineRegistry::with_defaults));
        let connections = Arc::new(SessionManager::new(self.config.session.clone()));
        let rooms = RoomRegistry::new(
            engines,
            connections.clone(),
            economy,
            persistence,
            self.config.game.clone(),
        );
        let matchmaker = Arc::new(Matchmaker::new(
            rooms.clone(),
            self.config.matchmaking.clone(),
        ));

        GameHall {
            rooms,
            matchmaker,
            connections,
            codec: JsonCodec,
            config: self.config,
        }
    }
}

impl Default for GameHallBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handles to the hall's periodic tasks. Dropping it stops them.
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// A game server without a transport.
pub struct GameHall<E, P> {
    rooms: RoomRegistry<E, P>,
    matchmaker: Arc<Matchmaker<E, P>>,
    connections: Arc<SessionManager>,
    codec: JsonCodec,
    config: ServerConfig,
}

impl GameHall<(), ()> {
    pub fn builder() -> GameHallBuilder {
        GameHallBuilder::new()
    }
}

impl<E: Economy, P: Persistence> GameHall<E, P> {
    // -----------------------------------------------------------------------
    // Background
    // -----------------------------------------------------------------------

    /// Starts the matchmaking scanner and the session expiry sweep.
    pub fn start_background(&self) -> BackgroundTasks {
        let scanner = self.matchmaker.clone().spawn();

        let rooms = self.rooms.clone();
        let matchmaker = self.matchmaker.clone();
        let connections = self.connections.clone();
        let period = Duration::from_millis(self.config.expiry_sweep_ms.max(1));
        let sweeper = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                for player in connections.expire_stale() {
                    info!(%player, "session expired");
                    if rooms.room_of(player).is_some() {
                        if let Err(e) = rooms.leave(player) {
                            warn!(%player, error = %e, "expired player could not leave room");
                        }
                    }
                    let _ = matchmaker.dequeue(player).await;
                }
                connections.cleanup_expired();
            }
        });

        BackgroundTasks {
            handles: vec![scanner, sweeper],
        }
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Registers a player's connection and returns their outbound queue.
    ///
    /// # Errors
    /// [`GamehallError::Session`] if the player is already connected.
    pub fn connect(
        &self,
        player: PlayerId,
    ) -> Result<UnboundedReceiver<ServerMessage>, GamehallError> {
        let rx = self.connections.connect(player)?;
        info!(%player, "player connected");
        Ok(rx)
    }

    /// Marks the connection lost. The player keeps their seat for the
    /// reconnect grace period but leaves the matchmaking queue.
    ///
    /// # Errors
    /// [`GamehallError::Session`] if the player has no session.
    pub async fn disconnect(&self, player: PlayerId) -> Result<(), GamehallError> {
        self.connections.disconnect(player)?;
        self.rooms.player_disconnected(player);
        let _ = self.matchmaker.dequeue(player).await;
        info!(%player, "player disconnected");
        Ok(())
    }

    /// Resumes a disconnected session. A player in a running game gets
    /// their view of it again.
    ///
    /// # Errors
    /// [`GamehallError::Session`] if there's nothing to resume or the
    /// grace period has passed.
    pub fn reconnect(
        &self,
        player: PlayerId,
    ) -> Result<UnboundedReceiver<ServerMessage>, GamehallError> {
        let rx = self.connections.reconnect(player)?;
        self.rooms.player_reconnected(player);
        info!(%player, "player reconnected");
        Ok(rx)
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Decodes one client frame, handles it, and queues the reply on the
    /// sender's connection. Undecodable frames get an `ERROR` 400.
    pub async fn handle_bytes(&self, player: PlayerId, data: &[u8]) {
        match self.codec.decode::<ClientMessage>(data) {
            Ok(msg) => self.handle_message(player, msg).await,
            Err(e) => {
                debug!(%player, error = %e, "undecodable frame");
                let err = GamehallError::from(e);
                self.connections.send_to_player(
                    player,
                    ServerMessage::error(None, err.code(), err.to_string()),
                );
            }
        }
    }

    /// Handles a decoded message and queues the reply on the sender's
    /// connection.
    pub async fn handle_message(&self, player: PlayerId, msg: ClientMessage) {
        let reply = self.request(player, msg).await;
        self.connections.send_to_player(player, reply);
    }

    /// Handles a message and returns the reply instead of queueing it.
    /// Notices to other players are still delivered.
    pub async fn request(&self, player: PlayerId, msg: ClientMessage) -> ServerMessage {
        handler::dispatch(self, player, msg).await
    }

    /// Encodes a server message with the hall's codec.
    ///
    /// # Errors
    /// [`GamehallError::Protocol`] if serialization fails.
    pub fn encode(&self, msg: &ServerMessage) -> Result<Vec<u8>, GamehallError> {
        Ok(self.codec.encode(msg)?)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn rooms(&self) -> &RoomRegistry<E, P> {
        &self.rooms
    }

    pub fn matchmaker(&self) -> &Arc<Matchmaker<E, P>> {
        &self.matchmaker
    }

    pub fn connections(&self) -> &Arc<SessionManager> {
        &self.connections
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
