//! Session types for Gamehall.
//!
//! Plain values with no behaviour beyond small helpers:
//!
//! - **Ids** ([`PlayerId`], [`RoomId`], [`GameType`]).
//! - **Events** ([`GameEvent`], [`opcodes`]), the envelope every player
//!   input and engine output travels in.
//! - **State** ([`GameState`], [`PlayerGameState`], [`Extensions`]),
//!   immutable snapshots replaced whole by the game session.
//! - **Results** ([`GameResult`]).
//! - **Lobby** ([`RoomState`], [`RoomSummary`], [`Player`]).
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) and the
//!   [`Codec`] that turns them into bytes.
//!
//! ```text
//! transport (bytes) → Codec → ClientMessage → gamehall facade
//! ```

mod codec;
mod error;
mod event;
mod ids;
mod lobby;
mod message;
mod result;
mod state;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use event::{GameEvent, Payload, TargetType, now_millis, opcodes};
pub use ids::{GameType, PlayerId, RoomId};
pub use lobby::{GameStartView, Player, PlayerSummary, RoomState, RoomSummary};
pub use message::{ClientMessage, RequestId, ServerMessage};
pub use result::{GameResult, RankedPlayer};
pub use state::{
    DEFAULT_TIMEOUT_MS, ExtValue, Extensions, GamePhase, GameState, PlayerGameState,
};
