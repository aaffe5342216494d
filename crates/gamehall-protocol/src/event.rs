//! The event envelope: the unit of player input and engine output.
//!
//! The envelope is stable regardless of transport:
//!
//! ```text
//! { senderId, roomId, opCode, payload, timestamp, targetType, targetIds }
//! ```
//!
//! Opcodes below [`opcodes::GAME_SPECIFIC_MIN`] are reserved for the
//! framework; everything at or above it is interpreted only by the engine
//! registered for the room's game type.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{PlayerId, RoomId};

/// Free-form event payload: a JSON object.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Reserved opcode values.
pub mod opcodes {
    /// Presence change: a player's connection dropped.
    pub const PLAYER_DISCONNECTED: i32 = 2;
    /// Presence change: a player came back within the grace period.
    pub const PLAYER_RECONNECTED: i32 = 3;
    /// First opcode value available to game engines.
    pub const GAME_SPECIFIC_MIN: i32 = 10;

    /// Returns `true` if `op` belongs to the reserved framework range.
    pub fn is_reserved(op: i32) -> bool {
        op < GAME_SPECIFIC_MIN
    }
}

/// Who an outgoing event is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    /// Every member of the room.
    #[default]
    Broadcast,
    /// Only the ids listed in `target_ids`.
    SpecificPlayers,
}

/// A player-submitted or engine-emitted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEvent {
    pub sender_id: PlayerId,
    pub room_id: RoomId,
    pub op_code: i32,
    #[serde(default)]
    pub payload: Payload,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    #[serde(default)]
    pub target_type: TargetType,
    #[serde(default)]
    pub target_ids: Vec<PlayerId>,
}

impl GameEvent {
    /// An event delivered to the whole room.
    pub fn broadcast(
        sender_id: PlayerId,
        room_id: RoomId,
        op_code: i32,
        payload: Payload,
    ) -> Self {
        Self {
            sender_id,
            room_id,
            op_code,
            payload,
            timestamp: now_millis(),
            target_type: TargetType::Broadcast,
            target_ids: Vec::new(),
        }
    }

    /// An event delivered only to `targets`.
    pub fn direct(
        sender_id: PlayerId,
        room_id: RoomId,
        op_code: i32,
        payload: Payload,
        targets: Vec<PlayerId>,
    ) -> Self {
        Self {
            target_type: TargetType::SpecificPlayers,
            target_ids: targets,
            ..Self::broadcast(sender_id, room_id, op_code, payload)
        }
    }

    /// The players this event should reach, given the room's members.
    pub fn recipients<'a>(&'a self, members: &'a [PlayerId]) -> &'a [PlayerId] {
        match self.target_type {
            TargetType::Broadcast => members,
            TargetType::SpecificPlayers => self.target_ids.as_slice(),
        }
    }
}

/// Wall-clock milliseconds since the Unix epoch (0 if the clock is before it).
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_envelope_uses_wire_field_names() {
        let mut payload = Payload::new();
        payload.insert("number".into(), json!(7));
        let event = GameEvent::direct(
            PlayerId(1),
            RoomId(2),
            10,
            payload,
            vec![PlayerId(3)],
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["senderId"], json!(1));
        assert_eq!(value["roomId"], json!(2));
        assert_eq!(value["opCode"], json!(10));
        assert_eq!(value["payload"]["number"], json!(7));
        assert_eq!(value["targetType"], json!("SPECIFIC_PLAYERS"));
        assert_eq!(value["targetIds"], json!([3]));
    }

    #[test]
    fn test_recipients_follow_target_type() {
        let members = [PlayerId(1), PlayerId(2)];
        let all = GameEvent::broadcast(PlayerId(1), RoomId(1), 10, Payload::new());
        assert_eq!(all.recipients(&members), &members);

        let one = GameEvent::direct(
            PlayerId(1),
            RoomId(1),
            10,
            Payload::new(),
            vec![PlayerId(2)],
        );
        assert_eq!(one.recipients(&members), &[PlayerId(2)]);
    }

    #[test]
    fn test_reserved_opcode_range() {
        assert!(opcodes::is_reserved(-1));
        assert!(opcodes::is_reserved(opcodes::PLAYER_DISCONNECTED));
        assert!(opcodes::is_reserved(9));
        assert!(!opcodes::is_reserved(10));
    }
}
