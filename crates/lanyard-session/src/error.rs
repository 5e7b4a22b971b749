//! Error types for the session layer.

use std::fmt;

use lanyard_transport::TransportError;

/// A launch credential that can be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    /// The launch token (`--token`, `--session-token`, or the token passed
    /// with an application identity).
    Token,
    /// `--user-id`.
    UserId,
    /// `--port`, or a port that is not a valid number.
    Endpoint,
    /// The application or game id passed to `init`.
    Subject,
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Token => "token",
            Self::UserId => "user id",
            Self::Endpoint => "companion endpoint",
            Self::Subject => "application or game id",
        })
    }
}

fn list(fields: &[CredentialField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur while establishing or using a session.
///
/// Every variant names what was unmet, because a game developer integrating
/// Lanyard must be able to tell a missing launch argument from a revoked
/// token from a companion that is not running.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// One or more required launch credentials were absent or empty.
    /// No remote call was made.
    #[error("missing launch credentials: {}", list(.0))]
    MissingCredentials(Vec<CredentialField>),

    /// The companion answered the validate call and refused the session.
    #[error("session validation rejected: {0}")]
    ValidationRejected(String),

    /// The companion could not be reached or answered unreadably.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A session-scoped call was attempted before authentication
    /// completed, after it failed, or after shutdown.
    #[error("session is not authenticated")]
    NotAuthenticated,

    /// `init` was called outside a Tokio runtime, so validation cannot
    /// be scheduled.
    #[error("no async runtime available to run session tasks")]
    NoRuntime,
}

impl SessionError {
    /// Maps a failed validate call: refusals become
    /// [`ValidationRejected`](Self::ValidationRejected), anything else
    /// stays a transport failure.
    pub(crate) fn from_validation(err: TransportError) -> Self {
        if !err.is_rejection() {
            return Self::Transport(err);
        }
        match err {
            TransportError::Rejected { message, .. } => Self::ValidationRejected(message),
            _ => Self::ValidationRejected("companion is not accepting sessions".into()),
        }
    }
}
