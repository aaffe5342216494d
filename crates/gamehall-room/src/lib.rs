//! Rooms, game sessions and the state store for Gamehall.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates rooms, routes players, starts games
//! - [`GameSession`]: the per-room tick loop (20 Hz by default)
//! - [`StateStore`]: latest [`GameState`](gamehall_protocol::GameState) per room
//! - [`Persistence`] / [`Economy`]: collaborators for profiles and coins
//! - [`LedgerEconomy`] / [`MemoryPersistence`]: ready-made implementations

#![allow(async_fn_in_trait)]

mod collab;
mod config;
pub mod economy;
mod error;
mod memory;
mod registry;
mod room;
mod session;
mod store;

pub use collab::{
    CoinTransaction, CollaboratorError, Economy, GameRecord, Persistence, StatsDelta,
    TransactionReason,
};
pub use config::{DEFAULT_MAX_PLAYERS, GameSessionConfig, RoomSpec};
pub use economy::LedgerEconomy;
pub use error::RoomError;
pub use memory::MemoryPersistence;
pub use registry::RoomRegistry;
pub use room::Room;
pub use session::{GameSession, SessionSink};
pub use store::StateStore;
