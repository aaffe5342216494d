//! FIFO matchmaking for Gamehall.
//!
//! - [`MatchQueue`]: pending requests in arrival order, one per player
//! - [`Matchmaker`]: validates requests and periodically seats groups in
//!   new rooms through the room registry

mod error;
mod matchmaker;
mod queue;

pub use error::MatchmakingError;
pub use matchmaker::{MatchOutcome, Matchmaker, MatchmakingConfig};
pub use queue::{MatchQueue, MatchRequest};
