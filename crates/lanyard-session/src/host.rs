//! The hosting process, as seen by the session.
//!
//! The lifecycle never calls `std::process::exit` itself; it asks a
//! [`Host`] to terminate. Engines that own their main loop can implement
//! the trait to shut down cleanly, and tests implement it to record calls.

use std::fmt;

use tracing::error;

/// Why the process is being ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Credentials were missing or validation did not succeed.
    AuthenticationFailed(String),
    /// The liveness monitor lost the companion.
    CompanionDisconnected(String),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed(e) => write!(f, "authentication failed: {e}"),
            Self::CompanionDisconnected(e) => write!(f, "companion disconnected: {e}"),
        }
    }
}

/// Owner of the process lifetime.
///
/// `terminate` may be called from a runtime worker thread. It is called at
/// most once per session.
pub trait Host: Send + Sync + 'static {
    fn terminate(&self, code: i32, reason: &ExitReason);
}

/// Ends the process with [`std::process::exit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessHost;

impl Host for ProcessHost {
    fn terminate(&self, code: i32, reason: &ExitReason) {
        error!(code, %reason, "terminating process");
        std::process::exit(code);
    }
}
