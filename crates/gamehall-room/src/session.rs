//! Game session: the fixed-rate loop that drives one room's game.
//!
//! Each running game owns a Tokio task. Player events arrive on an
//! unbounded queue and are drained at the start of every tick, so the
//! engine only ever sees one input at a time and the store has a single
//! writer per room:
//!
//! ```text
//! enqueue() ──→ [event queue] ──→ tick: drain → on_tick → win check
//!                                          │
//!                                          ▼
//!                                   StateStore::replace
//! ```
//!
//! Delivery and end-of-game bookkeeping go through a [`SessionSink`], which
//! the room registry implements.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use gamehall_engine::{EventError, GameEngine};
use gamehall_protocol::{
    GameEvent, GamePhase, GameResult, GameState, GameType, PlayerId, RoomId, opcodes,
};
use gamehall_tick::TickScheduler;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::{CollaboratorError, GameSessionConfig, StateStore};

// ---------------------------------------------------------------------------
// SessionSink
// ---------------------------------------------------------------------------

/// Where a game session sends its output.
pub trait SessionSink: Send + Sync + 'static {
    /// Routes an engine event to its recipients.
    fn deliver(&self, room_id: RoomId, event: GameEvent);

    /// Tells `player` their event was rejected. Other players hear nothing.
    fn reject(&self, room_id: RoomId, player: PlayerId, error: &EventError);

    /// Runs once per game, after the final state is stored with phase
    /// `GameOver`. Applies the economy, saves the result and notifies
    /// players.
    fn game_over(
        &self,
        room_id: RoomId,
        game_type: &GameType,
        result: &GameResult,
        duration_ms: u64,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

enum Status {
    Idle,
    Running(JoinHandle<()>),
    Stopped,
}

/// Handle to one room's game loop.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ start() ──→ (game over | stop())
///  Idle      Running          Stopped
/// ```
///
/// `start` is a no-op unless the session is idle, so a stopped session
/// never runs again.
pub struct GameSession {
    room_id: RoomId,
    events: UnboundedSender<GameEvent>,
    inbox: Mutex<Option<UnboundedReceiver<GameEvent>>>,
    status: Mutex<Status>,
    config: GameSessionConfig,
}

impl GameSession {
    pub fn new(room_id: RoomId, config: GameSessionConfig) -> Self {
        let (events, inbox) = mpsc::unbounded_channel();
        Self {
            room_id,
            events,
            inbox: Mutex::new(Some(inbox)),
            status: Mutex::new(Status::Idle),
            config,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Spawns the tick loop. Returns `false` if the session was already
    /// started or stopped.
    pub fn start<S: SessionSink>(
        &self,
        engine: Arc<dyn GameEngine>,
        store: Arc<StateStore>,
        sink: Arc<S>,
    ) -> bool {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*status, Status::Idle) {
            return false;
        }
        let Some(inbox) = self
            .inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return false;
        };

        let scheduler = TickScheduler::new(self.config.tick.clone());
        let handle = tokio::spawn(run(self.room_id, engine, store, sink, inbox, scheduler));
        *status = Status::Running(handle);
        true
    }

    /// Cancels the loop. Queued events are discarded. Idempotent.
    pub fn stop(&self) {
        let previous = std::mem::replace(
            &mut *self.status.lock().unwrap_or_else(PoisonError::into_inner),
            Status::Stopped,
        );
        if let Status::Running(handle) = previous {
            handle.abort();
            info!(room_id = %self.room_id, "game session stopped");
        }
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Queues an event for the next tick. Returns `false` once the loop
    /// has exited.
    pub fn enqueue(&self, event: GameEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn is_running(&self) -> bool {
        matches!(
            &*self.status.lock().unwrap_or_else(PoisonError::into_inner),
            Status::Running(handle) if !handle.is_finished()
        )
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

async fn run<S: SessionSink>(
    room_id: RoomId,
    engine: Arc<dyn GameEngine>,
    store: Arc<StateStore>,
    sink: Arc<S>,
    mut inbox: UnboundedReceiver<GameEvent>,
    mut scheduler: TickScheduler,
) {
    info!(%room_id, game_type = %engine.game_type(), tick_hz = scheduler.tick_rate_hz(), "game session started");

    loop {
        let tick = scheduler.wait_for_tick().await;

        match store.get(room_id) {
            Some(state) if !state.is_over() => {}
            _ => {
                debug!(%room_id, "no live state, session exiting");
                break;
            }
        }

        let mut result = None;

        while let Ok(event) = inbox.try_recv() {
            let Some(current) = store.get(room_id) else {
                break;
            };
            let applied = apply_event(
                room_id,
                engine.as_ref(),
                &store,
                sink.as_ref(),
                &current,
                event,
            );
            let Some(next) = applied else {
                continue;
            };
            result = engine.check_win_condition(&next);
            if result.is_some() {
                break;
            }
        }

        if result.is_none() {
            let Some(current) = store.get(room_id) else {
                break;
            };
            let mut ticked = (*current).clone();
            ticked.tick_count = tick.tick;
            ticked.elapsed_ms += tick.elapsed.as_millis() as u64;

            let outcome = engine.on_tick(&ticked, tick.elapsed);
            let Some(next) = store.replace(room_id, outcome.state) else {
                break;
            };
            for event in outcome.events {
                sink.deliver(room_id, event);
            }
            result = engine.check_win_condition(&next);
        }

        scheduler.record_tick_end();
        trace!(%room_id, tick = tick.tick, "tick processed");

        if let Some(result) = result {
            finish(room_id, &store, sink.as_ref(), result).await;
            break;
        }
    }

    let stats = scheduler.stats();
    debug!(
        %room_id,
        ticks = stats.ticks,
        late = stats.late_ticks,
        slow = stats.slow_ticks,
        longest_work_us = stats.longest_work.as_micros() as u64,
        "game session ended"
    );
}

/// Applies one queued event. Returns the new snapshot when the state
/// changed.
fn apply_event<S: SessionSink>(
    room_id: RoomId,
    engine: &dyn GameEngine,
    store: &StateStore,
    sink: &S,
    current: &GameState,
    event: GameEvent,
) -> Option<Arc<GameState>> {
    let sender = event.sender_id;

    match event.op_code {
        opcodes::PLAYER_DISCONNECTED | opcodes::PLAYER_RECONNECTED => {
            let next = if event.op_code == opcodes::PLAYER_DISCONNECTED {
                engine.on_player_disconnect(current, sender)
            } else {
                engine.on_player_reconnect(current, sender)
            };
            let next = store.replace(room_id, next)?;
            sink.deliver(room_id, event);
            Some(next)
        }
        op_code => match engine.on_player_event(current, sender, op_code, &event.payload) {
            Ok(outcome) => {
                let (state, events) = outcome.into_events();
                let next = store.replace(room_id, state)?;
                for event in events {
                    sink.deliver(room_id, event);
                }
                Some(next)
            }
            Err(e) => {
                debug!(%room_id, player_id = %sender, op_code, error = %e, "event rejected");
                sink.reject(room_id, sender, &e);
                None
            }
        },
    }
}

async fn finish<S: SessionSink>(
    room_id: RoomId,
    store: &StateStore,
    sink: &S,
    result: GameResult,
) {
    let Some(current) = store.get(room_id) else {
        return;
    };
    let mut over = (*current).clone();
    over.phase = GamePhase::GameOver;
    let duration_ms = over.elapsed_ms;
    let game_type = over.game_type.clone();
    if store.replace(room_id, over).is_none() {
        return;
    }

    info!(
        %room_id,
        winners = ?result.winner_ids,
        duration_ms,
        "game over"
    );

    if let Err(e) = sink.game_over(room_id, &game_type, &result, duration_ms).await {
        error!(%room_id, error = %e, "end-of-game bookkeeping failed");
    }
}
