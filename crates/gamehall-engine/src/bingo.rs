//! Bingo: take turns calling numbers, first to five lines wins.
//!
//! Extension fields, per player:
//!
//! | key          | value   | meaning                                  |
//! |--------------|---------|------------------------------------------|
//! | `board`      | `Ints`  | permutation of 1..=25, row-major 5×5     |
//! | `marked`     | `Ints`  | marked cell indexes, in marking order    |
//! | `lines`      | `Texts` | completed line ids (`ROW_0`, `DIAG_TL_BR`) |
//! | `line_count` | `Int`   | `lines.len()`                            |
//! | `letters`    | `Texts` | `B`, `I`, `N`, `G`, `O` up to line count |
//!
//! Global: `called` (`Ints`), the called numbers in call order.
//!
//! A board is private to its owner. The `NUMBER_CALLED` broadcast carries
//! only line counts and letters; each player's marked cells go out in a
//! `BOARD_UPDATE` addressed to that player alone.

use std::collections::BTreeMap;

use gamehall_protocol::{
    ExtValue, Extensions, GameEvent, GameResult, GameState, GameType, Payload, Player,
    PlayerGameState, PlayerId, RankedPlayer,
};
use rand::seq::SliceRandom;
use serde_json::json;

use crate::engine::{EngineOptions, EventOutcome, GameEngine, ensure_turn, int_field};
use crate::EventError;

pub const GAME_TYPE: &str = "BINGO";

/// Client → server: `{ number }`.
pub const CALL_NUMBER: i32 = 10;
/// Broadcast after each accepted call.
pub const NUMBER_CALLED: i32 = 11;
/// Direct, one per player: that player's marked cells and lines.
pub const BOARD_UPDATE: i32 = 12;

pub const BOARD_SIZE: usize = 5;
pub const LINES_TO_WIN: i64 = 5;
const LETTERS: [&str; 5] = ["B", "I", "N", "G", "O"];

/// Payoffs as (coins, xp).
const WIN_PAYOFF: (i64, i64) = (100, 50);
const DRAW_PAYOFF: (i64, i64) = (10, 20);
const LOSS_PAYOFF: (i64, i64) = (-20, 10);

/// The 12 winning lines: 5 rows, 5 columns, 2 diagonals.
fn lines() -> Vec<(String, [usize; BOARD_SIZE])> {
    let mut out = Vec::with_capacity(2 * BOARD_SIZE + 2);
    for r in 0..BOARD_SIZE {
        out.push((format!("ROW_{r}"), std::array::from_fn(|c| r * BOARD_SIZE + c)));
    }
    for c in 0..BOARD_SIZE {
        out.push((format!("COL_{c}"), std::array::from_fn(|r| r * BOARD_SIZE + c)));
    }
    out.push((
        "DIAG_TL_BR".to_string(),
        std::array::from_fn(|i| i * BOARD_SIZE + i),
    ));
    out.push((
        "DIAG_TR_BL".to_string(),
        std::array::from_fn(|i| i * BOARD_SIZE + (BOARD_SIZE - 1 - i)),
    ));
    out
}

#[derive(Debug, Clone)]
pub struct Bingo {
    game_type: GameType,
}

impl Bingo {
    pub fn new() -> Self {
        Self {
            game_type: GameType::new(GAME_TYPE),
        }
    }
}

impl Default for Bingo {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine for Bingo {
    fn game_type(&self) -> &GameType {
        &self.game_type
    }

    fn initialize_game(&self, players: &[Player], _options: &EngineOptions) -> GameState {
        let mut rng = rand::rng();
        let mut per_player = BTreeMap::new();
        for player in players {
            let mut board: Vec<i64> = (1..=25).collect();
            board.shuffle(&mut rng);
            let ext = Extensions::new()
                .with("board", ExtValue::Ints(board))
                .with("marked", ExtValue::Ints(Vec::new()))
                .with("lines", ExtValue::Texts(Vec::new()))
                .with("line_count", ExtValue::Int(0))
                .with("letters", ExtValue::Texts(Vec::new()));
            per_player.insert(player.id, PlayerGameState::new(player.id).with_ext(ext));
        }

        let mut turn_order: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
        turn_order.shuffle(&mut rng);

        let mut state = GameState::new(self.game_type.clone(), per_player, turn_order);
        state.ext.set("called", ExtValue::Ints(Vec::new()));
        state
    }

    fn on_player_event(
        &self,
        state: &GameState,
        sender: PlayerId,
        op_code: i32,
        payload: &Payload,
    ) -> Result<EventOutcome, EventError> {
        if op_code != CALL_NUMBER {
            return Err(EventError::InvalidOpcode(op_code));
        }
        ensure_turn(state, sender)?;
        let number = int_field(payload, "number")?;
        if !(1..=25).contains(&number) {
            return Err(EventError::OutOfRange {
                field: "number",
                value: number,
            });
        }
        let mut called = state.ext.ints("called").unwrap_or_default().to_vec();
        if called.contains(&number) {
            return Err(EventError::AlreadyCalled(number));
        }

        let mut next = state.clone();
        called.push(number);
        next.ext.set("called", ExtValue::Ints(called));

        let all_lines = lines();
        for player in next.players.values_mut() {
            mark_number(player, number, &all_lines);
        }
        next.current_turn_index = next.next_turn_index();

        let mut outcome = EventOutcome::new(next);
        outcome
            .broadcast
            .push(number_called(&outcome.state, sender, number));
        for player in outcome.state.players.values() {
            outcome.direct.push(board_update(&outcome.state, player));
        }
        Ok(outcome)
    }

    fn check_win_condition(&self, state: &GameState) -> Option<GameResult> {
        let winners: Vec<PlayerId> = state
            .players
            .values()
            .filter(|p| line_count(p) >= LINES_TO_WIN)
            .map(|p| p.player_id)
            .collect();
        if winners.is_empty() {
            return None;
        }

        let draw = winners.len() > 1;
        let win_payoff = if draw { DRAW_PAYOFF } else { WIN_PAYOFF };
        let mut result = GameResult::default();

        for player in state.players.values() {
            let id = player.player_id;
            let lines = line_count(player);
            let (rank, (coins, xp)) = if winners.contains(&id) {
                result.winner_ids.push(id);
                (1, win_payoff)
            } else {
                result.loser_ids.push(id);
                (2, LOSS_PAYOFF)
            };
            result.rankings.push(RankedPlayer {
                player_id: id,
                rank,
                score: lines,
            });
            result.coin_deltas.insert(id, coins);
            result.xp_deltas.insert(id, xp);
        }
        result.rankings.sort_by_key(|r| r.rank);

        let called = state.ext.ints("called").map_or(0, <[i64]>::len);
        result.summary.insert("draw".into(), json!(draw));
        result.summary.insert("numbersCalled".into(), json!(called));
        Some(result)
    }
}

/// Marks `number` on the player's board if present and records any line
/// it completes. Already-completed lines are never removed.
fn mark_number(player: &mut PlayerGameState, number: i64, all_lines: &[(String, [usize; 5])]) {
    let Some(cell) = player
        .ext
        .ints("board")
        .and_then(|board| board.iter().position(|n| *n == number))
    else {
        return;
    };

    let mut marked = player.ext.ints("marked").unwrap_or_default().to_vec();
    if marked.contains(&(cell as i64)) {
        return;
    }
    marked.push(cell as i64);

    let mut completed = player.ext.texts("lines").unwrap_or_default().to_vec();
    for (id, cells) in all_lines {
        if completed.contains(id) {
            continue;
        }
        if cells.iter().all(|c| marked.contains(&(*c as i64))) {
            completed.push(id.clone());
        }
    }

    let count = completed.len();
    let letters = LETTERS
        .iter()
        .take(count)
        .map(|l| (*l).to_string())
        .collect();
    player.score = count as i64;
    player.ext.set("marked", ExtValue::Ints(marked));
    player.ext.set("lines", ExtValue::Texts(completed));
    player.ext.set("line_count", ExtValue::Int(count as i64));
    player.ext.set("letters", ExtValue::Texts(letters));
}

fn line_count(player: &PlayerGameState) -> i64 {
    player.ext.int("line_count").unwrap_or(0)
}

fn number_called(state: &GameState, sender: PlayerId, number: i64) -> GameEvent {
    let progress: serde_json::Map<String, serde_json::Value> = state
        .players
        .values()
        .map(|p| {
            (
                p.player_id.0.to_string(),
                json!({
                    "lineCount": line_count(p),
                    "letters": p.ext.texts("letters").unwrap_or_default(),
                }),
            )
        })
        .collect();

    let mut payload = Payload::new();
    payload.insert("number".into(), json!(number));
    payload.insert("calledBy".into(), json!(sender));
    payload.insert("players".into(), serde_json::Value::Object(progress));
    payload.insert(
        "nextTurn".into(),
        json!(state.current_player()),
    );
    GameEvent::broadcast(sender, state.room_id, NUMBER_CALLED, payload)
}

fn board_update(state: &GameState, player: &PlayerGameState) -> GameEvent {
    let mut payload = Payload::new();
    payload.insert(
        "marked".into(),
        json!(player.ext.ints("marked").unwrap_or_default()),
    );
    payload.insert(
        "lines".into(),
        json!(player.ext.texts("lines").unwrap_or_default()),
    );
    GameEvent::direct(
        PlayerId::SERVER,
        state.room_id,
        BOARD_UPDATE,
        payload,
        vec![player.player_id],
    )
}
