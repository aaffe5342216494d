//! Client ↔ server message unions.
//!
//! Both directions are closed tagged unions. On the wire they are
//! internally tagged with a `"type"` field in SCREAMING_SNAKE_CASE and
//! camelCase fields:
//!
//! ```text
//! { "type": "JOIN_ROOM", "requestId": "r1", "roomId": 7, "password": null }
//! ```
//!
//! Every client message carries an optional `requestId` that the server
//! echoes back in the matching reply.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    GameEvent, GameResult, GameStartView, GameType, Payload, PlayerId, PlayerSummary,
    RoomId, RoomSummary,
};

/// Correlation id chosen by the client.
pub type RequestId = Option<String>;

/// Client → server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Lobby listing of joinable rooms, optionally filtered by game type.
    ListRooms {
        #[serde(default)]
        request_id: RequestId,
        #[serde(default)]
        game_type: Option<GameType>,
    },

    /// Create a room and join it as host. The entry fee is decided by the
    /// server's fee table.
    CreateRoom {
        #[serde(default)]
        request_id: RequestId,
        name: String,
        game_type: GameType,
        max_players: usize,
        #[serde(default)]
        is_private: bool,
        #[serde(default)]
        password: Option<String>,
        /// Engine options, e.g. `maxAttempts` for NUMBER_GUESS.
        #[serde(default)]
        options: BTreeMap<String, String>,
    },

    JoinRoom {
        #[serde(default)]
        request_id: RequestId,
        room_id: RoomId,
        #[serde(default)]
        password: Option<String>,
    },

    LeaveRoom {
        #[serde(default)]
        request_id: RequestId,
    },

    StartGame {
        #[serde(default)]
        request_id: RequestId,
    },

    /// A game-specific event for the sender's current room.
    SendEvent {
        #[serde(default)]
        request_id: RequestId,
        op_code: i32,
        #[serde(default)]
        payload: Payload,
    },

    JoinQueue {
        #[serde(default)]
        request_id: RequestId,
        game_type: GameType,
        #[serde(default)]
        min_players: Option<usize>,
        #[serde(default)]
        max_players: Option<usize>,
    },

    LeaveQueue {
        #[serde(default)]
        request_id: RequestId,
    },

    Ping {
        #[serde(default)]
        request_id: RequestId,
    },
}

impl ClientMessage {
    pub fn request_id(&self) -> &RequestId {
        match self {
            Self::ListRooms { request_id, .. }
            | Self::CreateRoom { request_id, .. }
            | Self::JoinRoom { request_id, .. }
            | Self::LeaveRoom { request_id }
            | Self::StartGame { request_id }
            | Self::SendEvent { request_id, .. }
            | Self::JoinQueue { request_id, .. }
            | Self::LeaveQueue { request_id }
            | Self::Ping { request_id } => request_id,
        }
    }
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// `code` follows HTTP-style conventions (400, 403, 404, 409, ...).
    Error {
        request_id: RequestId,
        code: u16,
        message: String,
    },

    Ok {
        request_id: RequestId,
    },

    RoomList {
        request_id: RequestId,
        rooms: Vec<RoomSummary>,
    },

    RoomJoined {
        request_id: RequestId,
        room: RoomSummary,
    },

    PlayerJoined {
        room_id: RoomId,
        player: PlayerSummary,
    },

    PlayerLeft {
        room_id: RoomId,
        player_id: PlayerId,
    },

    HostChanged {
        room_id: RoomId,
        host_id: PlayerId,
    },

    /// Tailored per recipient: `view.you` is only ever the recipient's own
    /// state.
    GameStarted {
        view: GameStartView,
    },

    /// An engine-emitted or presence event.
    Event {
        event: GameEvent,
    },

    GameOver {
        room_id: RoomId,
        result: GameResult,
    },

    MatchFound {
        room_id: RoomId,
        game_type: GameType,
    },

    Pong {
        request_id: RequestId,
    },
}

impl ServerMessage {
    pub fn error(request_id: RequestId, code: u16, message: impl Into<String>) -> Self {
        Self::Error {
            request_id,
            code,
            message: message.into(),
        }
    }
}
