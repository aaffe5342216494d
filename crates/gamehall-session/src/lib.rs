//! Player connection tracking for Gamehall.
//!
//! This crate is the "session transport" seen by the rest of the engine:
//!
//! 1. **Connections**: each connected player gets an outbound queue of
//!    [`ServerMessage`](gamehall_protocol::ServerMessage)s.
//! 2. **Delivery**: [`SessionManager::send_to_player`] is fire-and-forget.
//! 3. **Reconnection**: a dropped player keeps their session for a grace
//!    period (default 10 s) and can resume it.
//!
//! ```text
//! Room layer (above)     ← sends notices and game events to players
//!     ↕
//! Session layer (this)   ← who is connected, where messages go
//!     ↕
//! Protocol layer (below) ← PlayerId, ServerMessage
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig, SessionState};
