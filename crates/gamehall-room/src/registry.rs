//! The room registry: creates rooms, routes players, starts games.
//!
//! # Concurrency
//!
//! Every map is a `DashMap` and every multi-step operation that must be
//! atomic (seat reservation, host handoff, start) runs inside a single
//! `get_mut` guard. Guards never live across an `.await`; the async steps
//! (profile lookup, fee debit) happen between two guarded sections, and
//! the second section re-checks what the first one saw.
//!
//! # Joining
//!
//! ```text
//! claim player index ──→ reserve seat ──→ debit fee ──→ commit member
//!        │                    │               │               │
//!        ▼ already indexed    ▼ full/closed   ▼ can't pay     ▼ room gone
//!   AlreadyInRoom        release index    release both   refund + release
//! ```
//!
//! A failed join leaves membership and balance as they were.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use gamehall_engine::{EngineOptions, EngineRegistry, EventError, GameEngine};
use gamehall_protocol::{
    GameEvent, GameResult, GameStartView, GameState, GameType, Payload, PlayerId, RoomId,
    RoomState, RoomSummary, ServerMessage, opcodes,
};
use gamehall_session::SessionManager;
use tracing::{debug, error, info, warn};

use crate::{
    CollaboratorError, Economy, GameRecord, GameSession, GameSessionConfig, Persistence, Room,
    RoomError, RoomSpec, SessionSink, StateStore,
};

struct Shared<E, P> {
    rooms: DashMap<RoomId, Room>,
    /// A player can be in at most one room at a time.
    player_rooms: DashMap<PlayerId, RoomId>,
    sessions: DashMap<RoomId, Arc<GameSession>>,
    store: Arc<StateStore>,
    engines: Arc<EngineRegistry>,
    connections: Arc<SessionManager>,
    economy: Arc<E>,
    persistence: Arc<P>,
    config: GameSessionConfig,
    next_room_id: AtomicU64,
}

/// Entry point for room operations. Cheap to clone; clones share state.
pub struct RoomRegistry<E, P> {
    shared: Arc<Shared<E, P>>,
}

impl<E, P> Clone for RoomRegistry<E, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Departure {
    new_host: Option<PlayerId>,
    remaining: Vec<PlayerId>,
    state: RoomState,
    empty: bool,
}

impl<E: Economy, P: Persistence> RoomRegistry<E, P> {
    pub fn new(
        engines: Arc<EngineRegistry>,
        connections: Arc<SessionManager>,
        economy: Arc<E>,
        persistence: Arc<P>,
        config: GameSessionConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                rooms: DashMap::new(),
                player_rooms: DashMap::new(),
                sessions: DashMap::new(),
                store: Arc::new(StateStore::new()),
                engines,
                connections,
                economy,
                persistence,
                config,
                next_room_id: AtomicU64::new(1),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Creates an empty room in `WAITING`. The creator is recorded as host
    /// but is not a member until they join.
    ///
    /// # Errors
    /// - [`RoomError::Config`]: unknown game type
    /// - [`RoomError::InvalidSpec`]: capacity below the engine's minimum
    pub fn create(&self, host: PlayerId, spec: RoomSpec) -> Result<RoomSummary, RoomError> {
        let engine = self.shared.engines.get(spec.game_type.as_str())?;
        if spec.max_players < engine.min_players() {
            return Err(RoomError::InvalidSpec(format!(
                "{} needs at least {} players, room allows {}",
                spec.game_type,
                engine.min_players(),
                spec.max_players
            )));
        }

        let fee = self.shared.economy.entry_fee(&spec.game_type);
        let room_id = RoomId(self.shared.next_room_id.fetch_add(1, Ordering::Relaxed));
        let room = Room::new(room_id, host, spec, fee);
        let summary = room.summary();
        self.shared.rooms.insert(room_id, room);

        info!(%room_id, %host, game_type = %summary.game_type, "room created");
        Ok(summary)
    }

    /// Adds a player to a waiting room, charging the entry fee.
    ///
    /// # Errors
    /// `UnknownPlayer`, `AlreadyInRoom`, `NotFound`, `InvalidState`,
    /// `WrongPassword`, `RoomFull` or `InsufficientFunds`. None of them
    /// change membership or balances.
    pub async fn join(
        &self,
        player: PlayerId,
        room_id: RoomId,
        password: Option<&str>,
    ) -> Result<RoomSummary, RoomError> {
        let profile = self
            .shared
            .persistence
            .find_player(player)
            .await?
            .ok_or(RoomError::UnknownPlayer(player))?;

        match self.shared.player_rooms.entry(player) {
            Entry::Occupied(current) => {
                return Err(RoomError::AlreadyInRoom(player, *current.get()));
            }
            Entry::Vacant(slot) => {
                slot.insert(room_id);
            }
        }

        let game_type = match self.reserve_seat(player, room_id, password) {
            Ok(game_type) => game_type,
            Err(e) => {
                self.release_index(player, room_id);
                return Err(e);
            }
        };

        let charged = self
            .shared
            .economy
            .deduct_entry_fee(player, &game_type, room_id)
            .await;
        if let Err(e) = charged {
            self.release_seat(player, room_id);
            self.release_index(player, room_id);
            debug!(%player, %room_id, error = %e, "entry fee not paid");
            return Err(match e {
                CollaboratorError::InsufficientFunds { .. } => RoomError::InsufficientFunds {
                    player,
                    fee: self.shared.economy.entry_fee(&game_type),
                },
                other => other.into(),
            });
        }

        let (summary, others) = match self.commit_seat(player, room_id) {
            Ok(committed) => committed,
            Err(e) => {
                let refund = self
                    .shared
                    .economy
                    .refund_entry_fee(player, &game_type, room_id)
                    .await;
                if let Err(refund) = refund {
                    error!(%player, %room_id, error = %refund, "entry fee refund failed");
                }
                self.release_index(player, room_id);
                return Err(e);
            }
        };

        let notice = ServerMessage::PlayerJoined {
            room_id,
            player: profile.summary(),
        };
        self.send_all(&others, &notice);

        info!(%player, %room_id, members = summary.current_players, "player joined room");
        Ok(summary)
    }

    /// Removes a player from their room. Hands the host role to the
    /// earliest remaining member, tells a running game the player is gone,
    /// and closes the room once nobody is left.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`] if the player is not a member of any room.
    pub fn leave(&self, player: PlayerId) -> Result<RoomId, RoomError> {
        let room_id = self
            .room_of(player)
            .ok_or(RoomError::NotInRoom(player))?;

        let departure = {
            let Some(mut room) = self.shared.rooms.get_mut(&room_id) else {
                self.release_index(player, room_id);
                return Ok(room_id);
            };
            if !room.is_member(player) {
                return Err(RoomError::NotInRoom(player));
            }
            let new_host = room.remove_player(player);
            Departure {
                new_host,
                remaining: room.players.clone(),
                state: room.state,
                empty: room.is_empty(),
            }
        };
        self.release_index(player, room_id);

        self.send_all(
            &departure.remaining,
            &ServerMessage::PlayerLeft {
                room_id,
                player_id: player,
            },
        );
        if let Some(host_id) = departure.new_host {
            info!(%room_id, %host_id, "host reassigned");
            self.send_all(&departure.remaining, &ServerMessage::HostChanged { room_id, host_id });
        }

        if departure.state == RoomState::InGame {
            if let Some(session) = self.session(room_id) {
                session.enqueue(GameEvent::broadcast(
                    player,
                    room_id,
                    opcodes::PLAYER_DISCONNECTED,
                    Payload::new(),
                ));
            }
        }

        info!(%player, %room_id, "player left room");

        if departure.empty {
            self.close_if_empty(room_id);
        }
        Ok(room_id)
    }

    /// Hands the host role to the earliest member if the recorded host
    /// never joined or is gone. Members are told about the change.
    ///
    /// Returns the new host, or `None` if nothing changed.
    pub fn ensure_host_is_member(&self, room_id: RoomId) -> Option<PlayerId> {
        let (host_id, members) = {
            let mut room = self.shared.rooms.get_mut(&room_id)?;
            let host_id = room.promote_member_host()?;
            (host_id, room.players.clone())
        };
        info!(%room_id, %host_id, "host reassigned");
        self.send_all(&members, &ServerMessage::HostChanged { room_id, host_id });
        Some(host_id)
    }

    /// Starts the game. Only the host may start, only from `WAITING`, and
    /// only with at least the engine's minimum number of members.
    ///
    /// # Errors
    /// `NotFound`, `NotHost`, `InvalidState`, `Config` (unknown game type),
    /// `NotEnoughPlayers` or `UnknownPlayer`. On error the room stays in
    /// `WAITING`.
    pub async fn start(&self, player: PlayerId, room_id: RoomId) -> Result<(), RoomError> {
        let (game_type, members, options) = {
            let room = self
                .shared
                .rooms
                .get(&room_id)
                .ok_or(RoomError::NotFound(room_id))?;
            if room.host_id != player {
                return Err(RoomError::NotHost(player, room_id));
            }
            if room.state != RoomState::Waiting {
                return Err(RoomError::InvalidState(room_id, room.state));
            }
            (room.game_type.clone(), room.players.clone(), room.options.clone())
        };

        let engine = self.shared.engines.get(game_type.as_str())?;
        if members.len() < engine.min_players() {
            return Err(RoomError::NotEnoughPlayers {
                needed: engine.min_players(),
                have: members.len(),
            });
        }

        self.transition(room_id, player, RoomState::InGame)?;

        let state = match self.initial_state(engine.as_ref(), room_id, &members, &options).await {
            Ok(state) => state,
            Err(e) => {
                self.revert_to_waiting(room_id);
                return Err(e);
            }
        };

        // A close that raced us may have run its teardown before either
        // insert; undo both.
        self.shared.store.insert(room_id, state.clone());
        let session = Arc::new(GameSession::new(room_id, self.shared.config.clone()));
        self.shared.sessions.insert(room_id, Arc::clone(&session));
        if !self.shared.rooms.contains_key(&room_id) {
            self.teardown(room_id);
            return Err(RoomError::NotFound(room_id));
        }

        for (&member, you) in &state.players {
            let view = GameStartView {
                room_id,
                game_type: state.game_type.clone(),
                turn_order: state.turn_order.clone(),
                current_turn_index: state.current_turn_index,
                you: you.clone(),
            };
            self.shared
                .connections
                .send_to_player(member, ServerMessage::GameStarted { view });
        }

        session.start(engine, Arc::clone(&self.shared.store), Arc::new(self.clone()));

        info!(%room_id, %game_type, players = members.len(), "game started");
        Ok(())
    }

    /// Destroys a room: stops its game, drops its state and frees its
    /// members to join elsewhere.
    pub fn close(&self, room_id: RoomId) -> Result<(), RoomError> {
        let (_, room) = self
            .shared
            .rooms
            .remove(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        for &member in room.players() {
            self.release_index(member, room_id);
        }
        self.teardown(room_id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // In-game routing
    // -----------------------------------------------------------------------

    /// Queues a player's game event for the next tick of their room.
    ///
    /// # Errors
    /// - [`RoomError::ReservedOpcode`]: opcode below 10
    /// - [`RoomError::NotInRoom`]: player isn't in a room
    /// - [`RoomError::SessionStopped`]: no game running there
    pub fn submit_event(
        &self,
        player: PlayerId,
        op_code: i32,
        payload: Payload,
    ) -> Result<(), RoomError> {
        if opcodes::is_reserved(op_code) {
            return Err(RoomError::ReservedOpcode(op_code));
        }
        let room_id = self.room_of(player).ok_or(RoomError::NotInRoom(player))?;
        let session = self
            .session(room_id)
            .ok_or(RoomError::SessionStopped(room_id))?;
        if !session.enqueue(GameEvent::broadcast(player, room_id, op_code, payload)) {
            return Err(RoomError::SessionStopped(room_id));
        }
        Ok(())
    }

    /// Tells a running game that a player's connection dropped.
    pub fn player_disconnected(&self, player: PlayerId) {
        self.presence(player, opcodes::PLAYER_DISCONNECTED);
    }

    /// Tells a running game the player is back and re-sends their view of
    /// it.
    pub fn player_reconnected(&self, player: PlayerId) {
        let Some(room_id) = self.presence(player, opcodes::PLAYER_RECONNECTED) else {
            return;
        };
        let Some(state) = self.game_state(room_id) else {
            return;
        };
        if let Some(you) = state.players.get(&player) {
            let view = GameStartView {
                room_id,
                game_type: state.game_type.clone(),
                turn_order: state.turn_order.clone(),
                current_turn_index: state.current_turn_index,
                you: you.clone(),
            };
            self.shared
                .connections
                .send_to_player(player, ServerMessage::GameStarted { view });
        }
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn room(&self, room_id: RoomId) -> Option<RoomSummary> {
        self.shared.rooms.get(&room_id).map(|r| r.summary())
    }

    /// Members in join order.
    pub fn members(&self, room_id: RoomId) -> Option<Vec<PlayerId>> {
        self.shared.rooms.get(&room_id).map(|r| r.players.clone())
    }

    pub fn room_of(&self, player: PlayerId) -> Option<RoomId> {
        self.shared.player_rooms.get(&player).map(|r| *r)
    }

    pub fn session(&self, room_id: RoomId) -> Option<Arc<GameSession>> {
        self.shared.sessions.get(&room_id).map(|s| Arc::clone(&s))
    }

    /// Joinable rooms, optionally filtered by game type, oldest first.
    pub fn list(&self, game_type: Option<&GameType>) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .shared
            .rooms
            .iter()
            .filter(|r| r.state.is_joinable())
            .filter(|r| game_type.is_none_or(|g| &r.game_type == g))
            .map(|r| r.summary())
            .collect();
        rooms.sort_by_key(|r| r.id);
        rooms
    }

    pub fn game_state(&self, room_id: RoomId) -> Option<Arc<GameState>> {
        self.shared.store.get(room_id)
    }

    pub fn entry_fee(&self, game_type: &GameType) -> i64 {
        self.shared.economy.entry_fee(game_type)
    }

    pub fn len(&self) -> usize {
        self.shared.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.rooms.is_empty()
    }

    pub fn engines(&self) -> &Arc<EngineRegistry> {
        &self.shared.engines
    }

    pub fn connections(&self) -> &Arc<SessionManager> {
        &self.shared.connections
    }

    pub fn economy(&self) -> &Arc<E> {
        &self.shared.economy
    }

    pub fn persistence(&self) -> &Arc<P> {
        &self.shared.persistence
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn reserve_seat(
        &self,
        player: PlayerId,
        room_id: RoomId,
        password: Option<&str>,
    ) -> Result<GameType, RoomError> {
        let mut room = self
            .shared
            .rooms
            .get_mut(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        if !room.state.is_joinable() {
            return Err(RoomError::InvalidState(room_id, room.state));
        }
        if !room.check_password(password) {
            return Err(RoomError::WrongPassword(room_id));
        }
        if room.is_full() {
            return Err(RoomError::RoomFull(room_id));
        }
        room.reserved.push(player);
        Ok(room.game_type.clone())
    }

    /// Turns a reservation into membership. Returns the new summary and the
    /// members who were already there.
    fn commit_seat(
        &self,
        player: PlayerId,
        room_id: RoomId,
    ) -> Result<(RoomSummary, Vec<PlayerId>), RoomError> {
        let mut room = self
            .shared
            .rooms
            .get_mut(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        room.release_seat(player);
        if !room.state.is_joinable() {
            return Err(RoomError::InvalidState(room_id, room.state));
        }
        let others = room.players.clone();
        room.players.push(player);
        Ok((room.summary(), others))
    }

    fn release_seat(&self, player: PlayerId, room_id: RoomId) {
        if let Some(mut room) = self.shared.rooms.get_mut(&room_id) {
            room.release_seat(player);
        }
    }

    fn release_index(&self, player: PlayerId, room_id: RoomId) {
        self.shared
            .player_rooms
            .remove_if(&player, |_, current| *current == room_id);
    }

    /// Host-checked state change in one guarded step.
    fn transition(
        &self,
        room_id: RoomId,
        player: PlayerId,
        target: RoomState,
    ) -> Result<(), RoomError> {
        let mut room = self
            .shared
            .rooms
            .get_mut(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        if room.host_id != player {
            return Err(RoomError::NotHost(player, room_id));
        }
        if !room.state.can_transition_to(target) {
            return Err(RoomError::InvalidState(room_id, room.state));
        }
        room.state = target;
        Ok(())
    }

    fn revert_to_waiting(&self, room_id: RoomId) {
        if let Some(mut room) = self.shared.rooms.get_mut(&room_id) {
            if room.state == RoomState::InGame {
                room.state = RoomState::Waiting;
            }
        }
    }

    /// Builds the first snapshot from member profiles. Members who left
    /// while profiles loaded start out disconnected.
    async fn initial_state(
        &self,
        engine: &dyn GameEngine,
        room_id: RoomId,
        members: &[PlayerId],
        options: &EngineOptions,
    ) -> Result<GameState, RoomError> {
        let mut profiles = Vec::with_capacity(members.len());
        for &member in members {
            let profile = self
                .shared
                .persistence
                .find_player(member)
                .await?
                .ok_or(RoomError::UnknownPlayer(member))?;
            profiles.push(profile);
        }

        let mut state = engine.initialize_game(&profiles, options);
        state.room_id = room_id;

        let current = self.members(room_id).unwrap_or_default();
        for &gone in members.iter().filter(|m| !current.contains(m)) {
            warn!(%room_id, player_id = %gone, "member left while the game was starting");
            state = engine.on_player_disconnect(&state, gone);
        }
        Ok(state)
    }

    fn presence(&self, player: PlayerId, op_code: i32) -> Option<RoomId> {
        let room_id = self.room_of(player)?;
        let session = self.session(room_id)?;
        session.enqueue(GameEvent::broadcast(player, room_id, op_code, Payload::new()));
        Some(room_id)
    }

    fn close_if_empty(&self, room_id: RoomId) {
        if self
            .shared
            .rooms
            .remove_if(&room_id, |_, room| room.is_empty())
            .is_some()
        {
            self.teardown(room_id);
        }
    }

    fn teardown(&self, room_id: RoomId) {
        if let Some((_, session)) = self.shared.sessions.remove(&room_id) {
            session.stop();
        }
        self.shared.store.remove(room_id);
        info!(%room_id, "room closed");
    }

    fn send_all(&self, players: &[PlayerId], message: &ServerMessage) {
        for &player in players {
            self.shared
                .connections
                .send_to_player(player, message.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Session output
// ---------------------------------------------------------------------------

impl<E: Economy, P: Persistence> SessionSink for RoomRegistry<E, P> {
    fn deliver(&self, room_id: RoomId, event: GameEvent) {
        let Some(members) = self.members(room_id) else {
            return;
        };
        let recipients = event.recipients(&members).to_vec();
        let message = ServerMessage::Event { event };
        self.send_all(&recipients, &message);
    }

    fn reject(&self, room_id: RoomId, player: PlayerId, error: &EventError) {
        debug!(%room_id, %player, %error, "notifying sender of rejected event");
        self.shared
            .connections
            .send_to_player(player, ServerMessage::error(None, 400, error.to_string()));
    }

    async fn game_over(
        &self,
        room_id: RoomId,
        game_type: &GameType,
        result: &GameResult,
        duration_ms: u64,
    ) -> Result<(), CollaboratorError> {
        let applied = self.shared.economy.apply_game_result(room_id, result).await;
        if let Err(e) = &applied {
            error!(%room_id, error = %e, "applying game result failed");
        }

        let saved = self
            .shared
            .persistence
            .save_game_result(GameRecord {
                room_id,
                game_type: game_type.clone(),
                result: result.clone(),
                duration_ms,
            })
            .await;

        if let Some(mut room) = self.shared.rooms.get_mut(&room_id) {
            if room.state.can_transition_to(RoomState::Finished) {
                room.state = RoomState::Finished;
            }
        }
        self.shared.sessions.remove(&room_id);

        let members = self.members(room_id).unwrap_or_default();
        self.send_all(
            &members,
            &ServerMessage::GameOver {
                room_id,
                result: result.clone(),
            },
        );

        applied.and(saved)
    }
}
