//! NumberGuess: players take turns guessing a secret in 1..=100.
//!
//! Extension fields:
//!
//! - global `secret` (`Int`), never sent to clients before the game ends
//! - global `total_attempts`, `max_attempts` (`Int`)
//! - global `winner` (`Player`), set by the first correct guess
//! - per player `attempts` (`Int`)

use std::collections::BTreeMap;

use gamehall_protocol::{
    ExtValue, Extensions, GameEvent, GameResult, GameState, GameType, Payload, Player,
    PlayerGameState, PlayerId, RankedPlayer,
};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::json;
use tracing::warn;

use crate::EventError;
use crate::engine::{EngineOptions, EventOutcome, GameEngine, ensure_turn, int_field};

pub const GAME_TYPE: &str = "NUMBER_GUESS";

/// Client → server: `{ guess }`.
pub const GUESS: i32 = 10;
/// Broadcast: `{ playerId, guess, hint, attemptsLeft }`.
pub const GUESS_RESULT: i32 = 11;

pub const SECRET_MIN: i64 = 1;
pub const SECRET_MAX: i64 = 100;
pub const DEFAULT_MAX_ATTEMPTS: i64 = 10;
/// Room option overriding [`DEFAULT_MAX_ATTEMPTS`].
pub const MAX_ATTEMPTS_OPTION: &str = "maxAttempts";

const WIN_PAYOFF: (i64, i64) = (50, 30);
const LOSS_PAYOFF: (i64, i64) = (-10, 5);
const DRAW_PAYOFF: (i64, i64) = (0, 5);

/// How a guess compares to the secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    TooLow,
    TooHigh,
    Correct,
}

impl Hint {
    pub fn classify(guess: i64, secret: i64) -> Self {
        match guess.cmp(&secret) {
            std::cmp::Ordering::Less => Self::TooLow,
            std::cmp::Ordering::Greater => Self::TooHigh,
            std::cmp::Ordering::Equal => Self::Correct,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooLow => "TOO_LOW",
            Self::TooHigh => "TOO_HIGH",
            Self::Correct => "CORRECT",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SecretSource {
    Random,
    Fixed(i64),
}

#[derive(Debug, Clone)]
pub struct NumberGuess {
    game_type: GameType,
    secret: SecretSource,
}

impl NumberGuess {
    pub fn new() -> Self {
        Self {
            game_type: GameType::new(GAME_TYPE),
            secret: SecretSource::Random,
        }
    }

    /// Every game uses `secret`. For tests and demos.
    pub fn with_fixed_secret(secret: i64) -> Self {
        Self {
            secret: SecretSource::Fixed(secret),
            ..Self::new()
        }
    }

    fn draw_secret(&self) -> i64 {
        match self.secret {
            SecretSource::Random => rand::rng().random_range(SECRET_MIN..=SECRET_MAX),
            SecretSource::Fixed(secret) => secret,
        }
    }
}

impl Default for NumberGuess {
    fn default() -> Self {
        Self::new()
    }
}

fn max_attempts(options: &EngineOptions) -> i64 {
    let Some(raw) = options.get(MAX_ATTEMPTS_OPTION) else {
        return DEFAULT_MAX_ATTEMPTS;
    };
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => n,
        _ => {
            warn!(value = %raw, "ignoring invalid maxAttempts option");
            DEFAULT_MAX_ATTEMPTS
        }
    }
}

impl GameEngine for NumberGuess {
    fn game_type(&self) -> &GameType {
        &self.game_type
    }

    fn initialize_game(&self, players: &[Player], options: &EngineOptions) -> GameState {
        let per_player: BTreeMap<_, _> = players
            .iter()
            .map(|p| {
                let ext = Extensions::new().with("attempts", ExtValue::Int(0));
                (p.id, PlayerGameState::new(p.id).with_ext(ext))
            })
            .collect();

        let mut turn_order: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
        turn_order.shuffle(&mut rand::rng());

        let mut state = GameState::new(self.game_type.clone(), per_player, turn_order);
        state.ext = Extensions::new()
            .with("secret", ExtValue::Int(self.draw_secret()))
            .with("total_attempts", ExtValue::Int(0))
            .with("max_attempts", ExtValue::Int(max_attempts(options)));
        state
    }

    fn on_player_event(
        &self,
        state: &GameState,
        sender: PlayerId,
        op_code: i32,
        payload: &Payload,
    ) -> Result<EventOutcome, EventError> {
        if op_code != GUESS {
            return Err(EventError::InvalidOpcode(op_code));
        }
        ensure_turn(state, sender)?;
        let guess = int_field(payload, "guess")?;

        let secret = state.ext.int("secret").unwrap_or_default();
        let max = state.ext.int("max_attempts").unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let total = state.ext.int("total_attempts").unwrap_or(0) + 1;
        let hint = Hint::classify(guess, secret);

        let mut next = state.clone();
        next.ext.set("total_attempts", ExtValue::Int(total));
        if let Some(player) = next.players.get_mut(&sender) {
            let attempts = player.ext.int("attempts").unwrap_or(0) + 1;
            player.ext.set("attempts", ExtValue::Int(attempts));
        }
        if hint == Hint::Correct {
            next.ext.set("winner", ExtValue::Player(sender));
        }
        next.current_turn_index = next.next_turn_index();

        let mut body = Payload::new();
        body.insert("playerId".into(), json!(sender));
        body.insert("guess".into(), json!(guess));
        body.insert("hint".into(), json!(hint.as_str()));
        body.insert("attemptsLeft".into(), json!((max - total).max(0)));

        let event = GameEvent::broadcast(sender, next.room_id, GUESS_RESULT, body);
        let mut outcome = EventOutcome::new(next);
        outcome.broadcast.push(event);
        Ok(outcome)
    }

    fn check_win_condition(&self, state: &GameState) -> Option<GameResult> {
        let total = state.ext.int("total_attempts").unwrap_or(0);
        let max = state.ext.int("max_attempts").unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let winner = state.ext.player("winner");
        if winner.is_none() && total < max {
            return None;
        }

        let mut result = GameResult::default();
        for player in state.players.values() {
            let id = player.player_id;
            let attempts = player.ext.int("attempts").unwrap_or(0);
            let (rank, (coins, xp)) = match winner {
                Some(w) if w == id => {
                    result.winner_ids.push(id);
                    (1, WIN_PAYOFF)
                }
                Some(_) => {
                    result.loser_ids.push(id);
                    (2, LOSS_PAYOFF)
                }
                None => (1, DRAW_PAYOFF),
            };
            result.rankings.push(RankedPlayer {
                player_id: id,
                rank,
                score: attempts,
            });
            result.coin_deltas.insert(id, coins);
            result.xp_deltas.insert(id, xp);
        }
        result.rankings.sort_by_key(|r| r.rank);

        result.summary.insert(
            "secretNumber".into(),
            json!(state.ext.int("secret").unwrap_or_default()),
        );
        result.summary.insert("totalAttempts".into(), json!(total));
        Some(result)
    }
}
