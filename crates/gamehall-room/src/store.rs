//! The state store: latest [`GameState`] per room.
//!
//! States are immutable snapshots behind an `Arc`. Readers clone the `Arc`
//! and never block the writer; the writer (the room's game session)
//! swaps in a whole new snapshot.

use std::sync::Arc;

use dashmap::DashMap;
use gamehall_protocol::{GameState, RoomId};

#[derive(Default)]
pub struct StateStore {
    states: DashMap<RoomId, Arc<GameState>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot for the room.
    pub fn get(&self, room_id: RoomId) -> Option<Arc<GameState>> {
        self.states.get(&room_id).map(|s| Arc::clone(&s))
    }

    /// Stores the initial state when a game starts.
    pub fn insert(&self, room_id: RoomId, state: GameState) -> Arc<GameState> {
        let state = Arc::new(state);
        self.states.insert(room_id, Arc::clone(&state));
        state
    }

    /// Swaps in a new snapshot. Returns `None`, storing nothing, if the
    /// room's entry was already removed; a closed room never comes back.
    pub fn replace(&self, room_id: RoomId, state: GameState) -> Option<Arc<GameState>> {
        let mut entry = self.states.get_mut(&room_id)?;
        let state = Arc::new(state);
        *entry = Arc::clone(&state);
        Some(state)
    }

    pub fn remove(&self, room_id: RoomId) -> Option<Arc<GameState>> {
        self.states.remove(&room_id).map(|(_, s)| s)
    }

    pub fn contains(&self, room_id: RoomId) -> bool {
        self.states.contains_key(&room_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamehall_protocol::{GameType, PlayerGameState, PlayerId};
    use std::collections::BTreeMap;

    fn state(tick: u64) -> GameState {
        let players = BTreeMap::from([(PlayerId(1), PlayerGameState::new(PlayerId(1)))]);
        let mut s = GameState::new(GameType::new("TEST"), players, vec![PlayerId(1)]);
        s.tick_count = tick;
        s
    }

    #[test]
    fn test_replace_is_visible_to_new_readers_only() {
        let store = StateStore::new();
        store.insert(RoomId(1), state(0));
        let before = store.get(RoomId(1)).unwrap();

        store.replace(RoomId(1), state(5)).unwrap();

        assert_eq!(before.tick_count, 0);
        assert_eq!(store.get(RoomId(1)).unwrap().tick_count, 5);
    }

    #[test]
    fn test_replace_after_remove_does_not_resurrect() {
        let store = StateStore::new();
        store.insert(RoomId(1), state(0));
        store.remove(RoomId(1));

        assert!(store.replace(RoomId(1), state(1)).is_none());
        assert!(!store.contains(RoomId(1)));
        assert!(store.is_empty());
    }
}
