//! Error types for the sync layer.

use lanyard_protocol::StatKind;
use lanyard_transport::TransportError;

/// Errors that can occur during stat and achievement operations.
///
/// None of these end the process; the caller decides whether to retry.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The session is not authenticated (yet, any more, or at all).
    #[error("session is not authenticated")]
    NotAuthenticated,

    /// Stats were read or written before a successful `request_stats`.
    #[error("stats have not been loaded; call request_stats first")]
    CacheNotLoaded,

    /// No stat with this id was in the last loaded set.
    #[error("unknown stat {0:?}")]
    UnknownStat(String),

    /// The stat exists but holds the other kind. Values are never coerced.
    #[error("stat {id:?} is {actual}, not {expected}")]
    WrongKind {
        id: String,
        expected: StatKind,
        actual: StatKind,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}
