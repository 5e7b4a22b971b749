//! Transport abstraction layer for Lanyard.
//!
//! Provides the [`RemoteSessionProvider`] trait: everything the session and
//! sync layers need from the companion application, independent of how the
//! companion is reached.
//!
//! # Feature Flags
//!
//! - `http` (default): loopback HTTP realization via `reqwest`
//!   ([`HttpProvider`])
//! - `mock`: scriptable in-memory provider for tests ([`mock::MockProvider`])

mod error;
#[cfg(feature = "http")]
mod http;
#[cfg(feature = "mock")]
pub mod mock;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpProvider};

use std::future::Future;

use lanyard_protocol::{
    AchievementRecord, CompanionEndpoint, Notification, StatRecord, UserInfo,
    ValidateReply, ValidateRequest,
};

/// Which launch credentials a provider needs before it can validate.
///
/// The token is always required. A loopback transport additionally needs
/// to know who the user is and which port the companion listens on; a
/// transport that resolves everything from one opaque session token does
/// not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialRequirements {
    /// `--token`, `--user-id` and `--port`.
    #[default]
    TokenUserEndpoint,
    /// A single `--session-token`.
    SessionToken,
}

impl CredentialRequirements {
    pub fn needs_user_id(self) -> bool {
        matches!(self, Self::TokenUserEndpoint)
    }

    pub fn needs_endpoint(self) -> bool {
        matches!(self, Self::TokenUserEndpoint)
    }
}

/// Validates sessions against the companion application and carries every
/// session-scoped call afterwards.
///
/// # Trait bounds
///
/// - `Send + Sync` → one provider is shared by the liveness task and the
///   stat/achievement caches, which may run on different runtime threads.
/// - `'static` → it lives as long as the session does.
///
/// Every method except [`notify`](Self::notify) is request/response. None
/// of them retry; a failure is reported once and the caller decides.
pub trait RemoteSessionProvider: Send + Sync + 'static {
    /// What the launch arguments must contain for this provider.
    fn requirements(&self) -> CredentialRequirements;

    /// Validates the launch token and returns the session identity.
    ///
    /// `endpoint` is `Some` when the launch arguments carried a companion
    /// port. Providers that need one return
    /// [`TransportError::MissingEndpoint`] without it.
    fn validate(
        &self,
        endpoint: Option<&CompanionEndpoint>,
        request: &ValidateRequest,
    ) -> impl Future<Output = Result<ValidateReply, TransportError>> + Send;

    /// Cheap probe confirming the companion is still there.
    ///
    /// An explicit "not alive" answer is [`TransportError::NotAlive`].
    fn check_liveness(
        &self,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Profile of the signed-in companion user.
    fn user_info(
        &self,
    ) -> impl Future<Output = Result<UserInfo, TransportError>> + Send;

    fn unlock_achievement(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn list_achievements(
        &self,
    ) -> impl Future<Output = Result<Vec<AchievementRecord>, TransportError>> + Send;

    fn request_stats(
        &self,
    ) -> impl Future<Output = Result<Vec<StatRecord>, TransportError>> + Send;

    /// Overwrites the companion's values for every stat in `stats`.
    fn store_stats(
        &self,
        stats: &[StatRecord],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Fire-and-forget. Must not block and never reports failure.
    fn notify(&self, notification: Notification);
}
