//! Error types for the protocol layer.
//!
//! Each crate defines its own error enum. A `ProtocolError` always means
//! something went wrong turning values into bytes or back, never a room
//! or game rule problem.

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Malformed JSON, missing fields, wrong types, unknown message type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Decoded fine but violates a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
