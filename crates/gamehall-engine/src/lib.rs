//! Pluggable game rules for Gamehall.
//!
//! - [`GameEngine`]: the trait a rule set implements.
//! - [`EngineRegistry`]: game-type key → engine, built once at startup.
//! - [`Bingo`] and [`NumberGuess`]: the bundled variants.
//!
//! Engines are pure functions over [`GameState`](gamehall_protocol::GameState)
//! snapshots. Scheduling, storage and delivery belong to the room crate.

pub mod bingo;
mod engine;
mod error;
pub mod number_guess;
mod registry;

pub use bingo::Bingo;
pub use engine::{
    EngineOptions, EventOutcome, GameEngine, TickOutcome, ensure_turn, int_field,
    pass_absent_turn,
};
pub use error::{EngineError, EventError};
pub use number_guess::{Hint, NumberGuess};
pub use registry::{EngineRegistry, EngineRegistryBuilder};
