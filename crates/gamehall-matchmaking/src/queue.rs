//! The FIFO match queue.

use std::collections::VecDeque;

use gamehall_protocol::{GameType, PlayerId};
use tokio::time::Instant;

/// A player waiting for a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRequest {
    pub player_id: PlayerId,
    pub game_type: GameType,
    /// Preferred group bounds. Groups are sized by the engine; these are
    /// kept for the record.
    pub min_players: Option<usize>,
    pub max_players: Option<usize>,
    pub enqueued_at: Instant,
}

impl MatchRequest {
    pub fn new(player_id: PlayerId, game_type: impl Into<GameType>) -> Self {
        Self {
            player_id,
            game_type: game_type.into(),
            min_players: None,
            max_players: None,
            enqueued_at: Instant::now(),
        }
    }

    pub fn with_bounds(mut self, min_players: Option<usize>, max_players: Option<usize>) -> Self {
        self.min_players = min_players;
        self.max_players = max_players;
        self
    }
}

/// Requests in arrival order, at most one per player.
#[derive(Debug, Default)]
pub struct MatchQueue {
    requests: VecDeque<MatchRequest>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request. A pending request from the same player is
    /// dropped and returned; the new one goes to the back of the line.
    pub fn enqueue(&mut self, request: MatchRequest) -> Option<MatchRequest> {
        let replaced = self.remove(request.player_id);
        self.requests.push_back(request);
        replaced
    }

    pub fn remove(&mut self, player: PlayerId) -> Option<MatchRequest> {
        let index = self.requests.iter().position(|r| r.player_id == player)?;
        self.requests.remove(index)
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.requests.iter().any(|r| r.player_id == player)
    }

    /// Game types with pending requests, in order of their earliest
    /// request.
    pub fn game_types(&self) -> Vec<GameType> {
        let mut seen: Vec<GameType> = Vec::new();
        for request in &self.requests {
            if !seen.contains(&request.game_type) {
                seen.push(request.game_type.clone());
            }
        }
        seen
    }

    /// Removes and returns the `needed` earliest requests for `game_type`,
    /// or leaves the queue untouched and returns `None` if there are fewer.
    pub fn take_group(&mut self, game_type: &GameType, needed: usize) -> Option<Vec<MatchRequest>> {
        if needed == 0 {
            return None;
        }
        let available = self
            .requests
            .iter()
            .filter(|r| &r.game_type == game_type)
            .count();
        if available < needed {
            return None;
        }

        let mut group = Vec::with_capacity(needed);
        let mut rest = VecDeque::with_capacity(self.requests.len() - needed);
        for request in self.requests.drain(..) {
            if group.len() < needed && &request.game_type == game_type {
                group.push(request);
            } else {
                rest.push_back(request);
            }
        }
        self.requests = rest;
        Some(group)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: u64, game: &str) -> MatchRequest {
        MatchRequest::new(PlayerId(id), game)
    }

    fn ids(group: &[MatchRequest]) -> Vec<u64> {
        group.iter().map(|r| r.player_id.0).collect()
    }

    #[test]
    fn test_enqueue_replaces_and_moves_to_back() {
        let mut queue = MatchQueue::new();
        queue.enqueue(request(1, "BINGO"));
        queue.enqueue(request(2, "BINGO"));

        let replaced = queue.enqueue(request(1, "NUMBER_GUESS"));

        assert_eq!(replaced.map(|r| r.game_type), Some(GameType::new("BINGO")));
        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.game_types(),
            vec![GameType::new("BINGO"), GameType::new("NUMBER_GUESS")]
        );
    }

    #[test]
    fn test_take_group_takes_earliest_of_one_type() {
        let mut queue = MatchQueue::new();
        queue.enqueue(request(1, "BINGO"));
        queue.enqueue(request(2, "NUMBER_GUESS"));
        queue.enqueue(request(3, "BINGO"));
        queue.enqueue(request(4, "BINGO"));

        let group = queue.take_group(&GameType::new("BINGO"), 2).unwrap();

        assert_eq!(ids(&group), vec![1, 3]);
        assert_eq!(queue.len(), 2);
        assert!(queue.contains(PlayerId(2)));
        assert!(queue.contains(PlayerId(4)));
    }

    #[test]
    fn test_take_group_short_leaves_queue_untouched() {
        let mut queue = MatchQueue::new();
        queue.enqueue(request(1, "BINGO"));
        queue.enqueue(request(2, "NUMBER_GUESS"));

        assert!(queue.take_group(&GameType::new("BINGO"), 2).is_none());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut queue = MatchQueue::new();
        queue.enqueue(request(1, "BINGO"));
        assert!(queue.remove(PlayerId(1)).is_some());
        assert!(queue.remove(PlayerId(1)).is_none());
        assert!(queue.is_empty());
    }
}
