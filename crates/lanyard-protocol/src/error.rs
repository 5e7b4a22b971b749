//! Error types for the protocol layer.
//!
//! Each Lanyard crate defines its own error enum. When you see a
//! `ProtocolError`, the problem is in turning bodies into bytes or back,
//! not in reaching the companion or in session state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: the companion answered with an HTML error page,
    /// a field was renamed on its side, or the body was truncated.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The body decoded fine but violates a protocol rule, e.g. a
    /// validate reply with an empty game id.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
