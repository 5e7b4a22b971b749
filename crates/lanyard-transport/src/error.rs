use std::time::Duration;

use lanyard_protocol::ProtocolError;

/// Errors that can occur while talking to the companion application.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The call did not complete within its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request never produced a reply (connection refused, reset, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// The companion answered, but refused the request.
    #[error("companion rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A liveness probe got an explicit "not alive" answer.
    #[error("companion reported it is not alive")]
    NotAlive,

    /// A session call was made before any endpoint was bound by a
    /// successful validation.
    #[error("no companion endpoint bound; validate a session first")]
    NotBound,

    /// This transport needs a companion endpoint and none was supplied.
    #[error("transport requires a companion endpoint")]
    MissingEndpoint,

    /// The reply body could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl TransportError {
    /// `true` when the companion itself said no, as opposed to the call
    /// never reaching it or its answer being unreadable.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::NotAlive)
    }
}
