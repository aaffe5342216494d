//! The `GameEngine` trait, the extension point for game rules.
//!
//! An engine is a stateless rule set registered once under a game-type
//! key. The game session calls into it at the right time and stores
//! whatever state it hands back; the engine never touches shared maps or
//! does I/O.

use std::collections::BTreeMap;
use std::time::Duration;

use gamehall_protocol::{
    GameEvent, GameResult, GameState, GameType, Payload, Player, PlayerId,
};

use crate::EventError;

/// Room options as given at room creation (`maxAttempts` = `"5"`, ...).
pub type EngineOptions = BTreeMap<String, String>;

/// What `on_tick` hands back.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub state: GameState,
    pub events: Vec<GameEvent>,
}

/// What an accepted player event hands back.
///
/// `broadcast` events go to every room member; `direct` events carry
/// their own target list.
#[derive(Debug, Clone)]
pub struct EventOutcome {
    pub state: GameState,
    pub broadcast: Vec<GameEvent>,
    pub direct: Vec<GameEvent>,
}

impl EventOutcome {
    pub fn new(state: GameState) -> Self {
        Self {
            state,
            broadcast: Vec::new(),
            direct: Vec::new(),
        }
    }

    /// All events in emission order: broadcasts first, then direct.
    pub fn into_events(self) -> (GameState, Vec<GameEvent>) {
        let mut events = self.broadcast;
        events.extend(self.direct);
        (self.state, events)
    }
}

/// A pluggable rule set.
///
/// Every method takes the current state by reference and returns a new
/// value; the caller decides whether to publish it. Implementations must
/// be `Send + Sync + 'static` because one instance is shared by every
/// room of its game type.
pub trait GameEngine: Send + Sync + 'static {
    /// The key this engine is registered under.
    fn game_type(&self) -> &GameType;

    /// Players needed before a room can start. Default: 2.
    fn min_players(&self) -> usize {
        2
    }

    /// Builds the initial state: turn order and per-player extension
    /// fields. Must set `phase = InProgress`. `room_id` is filled in by
    /// the caller.
    fn initialize_game(&self, players: &[Player], options: &EngineOptions) -> GameState;

    /// Called once per scheduler tick with the real time since the
    /// previous tick. Default: passes a turn held by a player who is not
    /// alive to the next one who is. No events.
    fn on_tick(&self, state: &GameState, _elapsed: Duration) -> TickOutcome {
        let mut next = state.clone();
        pass_absent_turn(&mut next);
        TickOutcome {
            state: next,
            events: Vec::new(),
        }
    }

    /// Validates and applies one player event.
    ///
    /// On `Err` the caller keeps the previous state and the turn does not
    /// advance.
    fn on_player_event(
        &self,
        state: &GameState,
        sender: PlayerId,
        op_code: i32,
        payload: &Payload,
    ) -> Result<EventOutcome, EventError>;

    /// Returns a result once a terminal condition holds.
    ///
    /// Pure: calling it again on the same state returns the same value and
    /// has no side effects.
    fn check_win_condition(&self, state: &GameState) -> Option<GameResult>;

    /// Presence hook for a dropped connection. Default: clear `alive` and
    /// pass the turn on if the player held it.
    fn on_player_disconnect(&self, state: &GameState, player: PlayerId) -> GameState {
        let mut next = set_alive(state, player, false);
        pass_absent_turn(&mut next);
        next
    }

    /// Presence hook for a connection restored within the grace period.
    /// Default: set `alive`.
    fn on_player_reconnect(&self, state: &GameState, player: PlayerId) -> GameState {
        set_alive(state, player, true)
    }
}

fn set_alive(state: &GameState, player: PlayerId, alive: bool) -> GameState {
    let mut next = state.clone();
    if let Some(p) = next.players.get_mut(&player) {
        p.alive = alive;
    }
    next
}

/// Moves the turn off a player who is not alive. Leaves it in place when
/// nobody alive is left to take it.
pub fn pass_absent_turn(state: &mut GameState) {
    if let Some(index) = state.next_present_turn_index() {
        state.current_turn_index = index;
    }
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// Reads an integer field, rejecting a missing or non-integer value.
pub fn int_field(payload: &Payload, field: &'static str) -> Result<i64, EventError> {
    payload
        .get(field)
        .and_then(serde_json::Value::as_i64)
        .ok_or(EventError::MissingField(field))
}

/// Common checks before a turn-based event is applied: the sender must be
/// registered and must hold the current turn.
pub fn ensure_turn(state: &GameState, sender: PlayerId) -> Result<(), EventError> {
    if !state.players.contains_key(&sender) {
        return Err(EventError::UnknownPlayer(sender));
    }
    if state.current_player() != Some(sender) {
        return Err(EventError::NotYourTurn);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use gamehall_protocol::PlayerGameState;
    use serde_json::json;

    use super::*;

    fn two_player_state() -> GameState {
        let players = [PlayerId(1), PlayerId(2)]
            .into_iter()
            .map(|id| (id, PlayerGameState::new(id)))
            .collect();
        GameState::new(GameType::new("T"), players, vec![PlayerId(1), PlayerId(2)])
    }

    #[test]
    fn test_int_field_rejects_missing_and_wrong_type() {
        let mut payload = Payload::new();
        assert!(matches!(
            int_field(&payload, "number"),
            Err(EventError::MissingField("number"))
        ));
        payload.insert("number".into(), json!("seven"));
        assert!(int_field(&payload, "number").is_err());
        payload.insert("number".into(), json!(7));
        assert_eq!(int_field(&payload, "number").unwrap(), 7);
    }

    #[test]
    fn test_ensure_turn() {
        let state = two_player_state();
        assert!(ensure_turn(&state, PlayerId(1)).is_ok());
        assert!(matches!(
            ensure_turn(&state, PlayerId(2)),
            Err(EventError::NotYourTurn)
        ));
        assert!(matches!(
            ensure_turn(&state, PlayerId(9)),
            Err(EventError::UnknownPlayer(PlayerId(9)))
        ));
    }

    struct Plain(GameType);

    impl GameEngine for Plain {
        fn game_type(&self) -> &GameType {
            &self.0
        }

        fn initialize_game(&self, _players: &[Player], _options: &EngineOptions) -> GameState {
            two_player_state()
        }

        fn on_player_event(
            &self,
            state: &GameState,
            _sender: PlayerId,
            _op_code: i32,
            _payload: &Payload,
        ) -> Result<EventOutcome, EventError> {
            Ok(EventOutcome::new(state.clone()))
        }

        fn check_win_condition(&self, _state: &GameState) -> Option<GameResult> {
            None
        }
    }

    fn three_player_state() -> GameState {
        let order = vec![PlayerId(1), PlayerId(2), PlayerId(3)];
        let players = order
            .iter()
            .map(|&id| (id, PlayerGameState::new(id)))
            .collect();
        GameState::new(GameType::new("T"), players, order)
    }

    #[test]
    fn test_disconnect_of_turn_holder_passes_turn() {
        let engine = Plain(GameType::new("T"));
        let state = three_player_state();

        let next = engine.on_player_disconnect(&state, PlayerId(1));
        assert_eq!(next.current_player(), Some(PlayerId(2)));

        let next = engine.on_player_disconnect(&next, PlayerId(3));
        assert_eq!(next.current_player(), Some(PlayerId(2)));
    }

    #[test]
    fn test_tick_passes_turn_that_lands_on_absent_player() {
        let engine = Plain(GameType::new("T"));
        let mut state = engine.on_player_disconnect(&three_player_state(), PlayerId(2));
        assert_eq!(state.current_player(), Some(PlayerId(1)));

        state.current_turn_index = state.next_turn_index();
        assert_eq!(state.current_player(), Some(PlayerId(2)));

        let ticked = engine.on_tick(&state, Duration::from_millis(50)).state;
        assert_eq!(ticked.current_player(), Some(PlayerId(3)));
    }

    #[test]
    fn test_turn_stays_when_nobody_else_is_alive() {
        let engine = Plain(GameType::new("T"));
        let state = engine.on_player_disconnect(&two_player_state(), PlayerId(2));
        let state = engine.on_player_disconnect(&state, PlayerId(1));
        assert_eq!(state.current_player(), Some(PlayerId(1)));
    }

    #[test]
    fn test_set_alive_leaves_input_untouched() {
        let state = two_player_state();
        let next = set_alive(&state, PlayerId(2), false);
        assert!(!next.players[&PlayerId(2)].alive);
        assert!(state.players[&PlayerId(2)].alive);
    }
}
