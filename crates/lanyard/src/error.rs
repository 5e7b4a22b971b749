//! Unified error type for Lanyard.

use lanyard_protocol::ProtocolError;
use lanyard_session::{SessionError, SessionState};
use lanyard_sync::SyncError;
use lanyard_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `lanyard` facade you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LanyardError {
    /// Encoding or decoding a companion message failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Reaching the companion failed (timeout, refused, rejected).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Credentials, validation, or a session-scoped call failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A stat or achievement operation failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// `authenticate` settled in a state other than `Authenticated`.
    #[error("session ended up {state}: {message}")]
    NotAuthenticated { state: SessionState, message: String },
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Timeout(Duration::from_secs(5));
        let lanyard_err: LanyardError = err.into();
        assert!(matches!(lanyard_err, LanyardError::Transport(_)));
        assert!(lanyard_err.to_string().contains("timed out"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let lanyard_err: LanyardError = err.into();
        assert!(matches!(lanyard_err, LanyardError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::ValidationRejected("nope".into());
        let lanyard_err: LanyardError = err.into();
        assert!(matches!(lanyard_err, LanyardError::Session(_)));
        assert!(lanyard_err.to_string().contains("nope"));
    }

    #[test]
    fn test_from_sync_error() {
        let err = SyncError::CacheNotLoaded;
        let lanyard_err: LanyardError = err.into();
        assert!(matches!(lanyard_err, LanyardError::Sync(_)));
    }

    #[test]
    fn test_not_authenticated_names_state() {
        let err = LanyardError::NotAuthenticated {
            state: SessionState::Failed,
            message: "token revoked".into(),
        };
        assert_eq!(err.to_string(), "session ended up failed: token revoked");
    }
}
