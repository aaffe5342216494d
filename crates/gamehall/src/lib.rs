//! # Gamehall
//!
//! Real-time multiplayer session engine: rooms with entry fees, FIFO
//! matchmaking, and server-authoritative games driven by a fixed-rate tick
//! loop.
//!
//! Game rules plug in through the [`GameEngine`](gamehall_engine::GameEngine)
//! trait; BINGO and NUMBER_GUESS ship built in. Player profiles and coins
//! live behind the [`Persistence`](gamehall_room::Persistence) and
//! [`Economy`](gamehall_room::Economy) traits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gamehall::prelude::*;
//!
//! # async fn run() -> Result<(), GamehallError> {
//! let config = ServerConfig::load("gamehall.toml")?;
//! init_tracing(&config.log_level);
//!
//! let hall = GameHall::builder()
//!     .config(config)
//!     .build(Arc::new(MemoryPersistence::new()));
//! let _tasks = hall.start_background();
//!
//! let mut outbound = hall.connect(PlayerId(1))?;
//! hall.handle_bytes(PlayerId(1), br#"{"type":"PING","requestId":"r1"}"#).await;
//! assert!(matches!(outbound.recv().await, Some(ServerMessage::Pong { .. })));
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod handler;
mod logging;
mod server;

pub use config::ServerConfig;
pub use error::GamehallError;
pub use logging::init_tracing;
pub use server::{BackgroundTasks, GameHall, GameHallBuilder};

pub use gamehall_engine as engine;
pub use gamehall_matchmaking as matchmaking;
pub use gamehall_protocol as protocol;
pub use gamehall_room as room;
pub use gamehall_session as session;
pub use gamehall_tick as tick;

pub mod prelude {
    pub use crate::{GameHall, GameHallBuilder, GamehallError, ServerConfig, init_tracing};
    pub use gamehall_engine::{EngineRegistry, GameEngine};
    pub use gamehall_matchmaking::{MatchRequest, MatchmakingConfig};
    pub use gamehall_protocol::{
        ClientMessage, GameEvent, GameResult, GameType, Player, PlayerId, RoomId,
        ServerMessage,
    };
    pub use gamehall_room::{
        Economy, GameSessionConfig, LedgerEconomy, MemoryPersistence, Persistence, RoomSpec,
    };
    pub use gamehall_session::SessionConfig;
}
