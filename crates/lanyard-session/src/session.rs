//! Session types: the record of this process's authenticated identity.
//!
//! A session tracks:
//! - WHO the process is (`game_id`, `user_id`, once validated)
//! - WHERE the companion listens (`companion`)
//! - WHAT state the lifecycle is in
//! - WHY it failed, if it did (`last_error`)

use std::fmt;
use std::time::Duration;

use lanyard_heartbeat::HeartbeatConfig;
use lanyard_protocol::CompanionEndpoint;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the session lifecycle.
///
/// Sensible defaults are provided; override only the fields you care
/// about with struct update syntax:
///
/// ```ignore
/// let config = SessionConfig {
///     termination_grace: Duration::from_secs(3),
///     ..SessionConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on the validate call. Expiry fails the session exactly
    /// like a rejection.
    pub validation_timeout: Duration,

    /// Delay between entering `Failed` and asking the host to exit, so
    /// diagnostics can flush.
    pub termination_grace: Duration,

    /// Interval and probe timeout of the liveness monitor.
    pub liveness: HeartbeatConfig,

    /// Buffered lifecycle events per subscriber before the slowest one
    /// starts losing the oldest.
    pub event_capacity: usize,

    /// Exit code handed to the host on forced termination.
    pub exit_code: i32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            validation_timeout: Duration::from_secs(10),
            termination_grace: Duration::from_secs(1),
            liveness: HeartbeatConfig::default(),
            event_capacity: 64,
            exit_code: 1,
        }
    }
}

impl SessionConfig {
    /// Clamp values that would otherwise panic or never fire.
    pub fn validated(mut self) -> Self {
        self.event_capacity = self.event_capacity.max(1);
        if self.validation_timeout.is_zero() {
            self.validation_timeout = Self::default().validation_timeout;
        }
        self.liveness = self.liveness.validated();
        self
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the lifecycle is.
///
/// ```text
///   Uninitialized ──init──→ ArgsParsed ──→ Validating ──→ Authenticated
///                               │              │               │
///                               └──────────────┴──→ Failed     └──→ Disconnected
/// ```
///
/// `Authenticated` is the only state in which session-scoped calls are
/// allowed. `Failed` and `Disconnected` end the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    ArgsParsed,
    Validating,
    Authenticated,
    Failed,
    Disconnected,
}

impl SessionState {
    /// `true` once the lifecycle can no longer move on its own.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Authenticated | Self::Failed | Self::Disconnected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::ArgsParsed => "args-parsed",
            Self::Validating => "validating",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
            Self::Disconnected => "disconnected",
        })
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The one session of this process.
///
/// Only the lifecycle mutates it. Readers get snapshots, and the identity
/// accessors answer `None` unless the snapshot was taken while
/// `Authenticated`.
#[derive(Clone, Default)]
pub struct Session {
    pub(crate) raw_token: String,
    pub(crate) user_id: Option<String>,
    pub(crate) companion: Option<CompanionEndpoint>,
    pub(crate) game_id: Option<String>,
    pub(crate) state: SessionState,
    pub(crate) last_error: Option<String>,
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|_| self.is_authenticated())
    }

    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref().filter(|_| self.is_authenticated())
    }

    pub fn companion(&self) -> Option<&CompanionEndpoint> {
        self.companion.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// `true` once a launch token has been accepted from the arguments.
    pub fn has_token(&self) -> bool {
        !self.raw_token.is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("game_id", &self.game_id)
            .field("user_id", &self.user_id)
            .field("companion", &self.companion)
            .field("last_error", &self.last_error)
            .field("has_token", &self.has_token())
            .finish()
    }
}
