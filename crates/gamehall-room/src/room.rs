//! The room entity: lobby metadata plus an ordered member list.

use gamehall_engine::EngineOptions;
use gamehall_protocol::{GameType, PlayerId, RoomId, RoomState, RoomSummary};

use crate::RoomSpec;

/// A room as held by the registry.
///
/// `players` keeps join order and has no duplicates. `reserved` holds seats
/// claimed by joins whose entry fee is still being charged; they count
/// towards capacity but are not members yet.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub game_type: GameType,
    pub max_players: usize,
    pub is_private: bool,
    pub(crate) password: Option<String>,
    pub host_id: PlayerId,
    pub entry_fee: i64,
    pub options: EngineOptions,
    pub state: RoomState,
    pub(crate) players: Vec<PlayerId>,
    pub(crate) reserved: Vec<PlayerId>,
}

impl Room {
    pub(crate) fn new(id: RoomId, host_id: PlayerId, spec: RoomSpec, entry_fee: i64) -> Self {
        Self {
            id,
            name: spec.name,
            game_type: spec.game_type,
            max_players: spec.max_players,
            is_private: spec.is_private,
            password: spec.password,
            host_id,
            entry_fee,
            options: spec.options,
            state: RoomState::Waiting,
            players: Vec::new(),
            reserved: Vec::new(),
        }
    }

    /// Members in join order.
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn is_member(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    /// Members plus in-flight joins have reached `max_players`.
    pub fn is_full(&self) -> bool {
        self.players.len() + self.reserved.len() >= self.max_players
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.reserved.is_empty()
    }

    /// Public rooms accept any password.
    pub fn check_password(&self, given: Option<&str>) -> bool {
        !self.is_private || self.password.as_deref() == given
    }

    /// Removes a member. If the host left, the earliest remaining member
    /// becomes host and is returned.
    pub(crate) fn remove_player(&mut self, player: PlayerId) -> Option<PlayerId> {
        self.players.retain(|&p| p != player);
        if self.host_id == player {
            if let Some(&next) = self.players.first() {
                self.host_id = next;
                return Some(next);
            }
        }
        None
    }

    /// If the host is not a member, makes the earliest member host and
    /// returns them.
    pub(crate) fn promote_member_host(&mut self) -> Option<PlayerId> {
        if self.is_member(self.host_id) {
            return None;
        }
        let next = *self.players.first()?;
        self.host_id = next;
        Some(next)
    }

    pub(crate) fn release_seat(&mut self, player: PlayerId) {
        self.reserved.retain(|&p| p != player);
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id,
            name: self.name.clone(),
            game_type: self.game_type.clone(),
            max_players: self.max_players,
            current_players: self.players.len(),
            is_private: self.is_private,
            state: self.state,
            host_id: self.host_id,
            entry_fee: self.entry_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(max: usize) -> Room {
        Room::new(
            RoomId(1),
            PlayerId(1),
            RoomSpec::new("r", "BINGO").max_players(max),
            10,
        )
    }

    #[test]
    fn test_reserved_seats_count_towards_capacity() {
        let mut r = room(2);
        r.players.push(PlayerId(1));
        assert!(!r.is_full());
        r.reserved.push(PlayerId(2));
        assert!(r.is_full());
        r.release_seat(PlayerId(2));
        assert!(!r.is_full());
    }

    #[test]
    fn test_remove_host_promotes_earliest_member() {
        let mut r = room(4);
        r.players.extend([PlayerId(1), PlayerId(2), PlayerId(3)]);

        assert_eq!(r.remove_player(PlayerId(1)), Some(PlayerId(2)));
        assert_eq!(r.host_id, PlayerId(2));
        assert_eq!(r.remove_player(PlayerId(3)), None);
        assert_eq!(r.players(), &[PlayerId(2)]);
    }

    #[test]
    fn test_promote_member_host_only_when_host_is_absent() {
        let mut r = room(4);
        assert_eq!(r.promote_member_host(), None);

        r.players.extend([PlayerId(2), PlayerId(3)]);
        assert_eq!(r.promote_member_host(), Some(PlayerId(2)));
        assert_eq!(r.host_id, PlayerId(2));
        assert_eq!(r.promote_member_host(), None);
    }

    #[test]
    fn test_check_password() {
        let public = room(2);
        assert!(public.check_password(None));

        let private = Room::new(
            RoomId(2),
            PlayerId(1),
            RoomSpec::new("r", "BINGO").password("pw"),
            0,
        );
        assert!(private.check_password(Some("pw")));
        assert!(!private.check_password(Some("nope")));
        assert!(!private.check_password(None));
    }

    #[test]
    fn test_summary_counts_members_only() {
        let mut r = room(3);
        r.players.push(PlayerId(1));
        r.reserved.push(PlayerId(2));
        let summary = r.summary();
        assert_eq!(summary.current_players, 1);
        assert_eq!(summary.state, RoomState::Waiting);
        assert_eq!(summary.entry_fee, 10);
    }
}
