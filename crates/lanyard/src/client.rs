//! `Lanyard` client and its builder.
//!
//! This is the entry point for a game. It ties the layers together:
//! launch arguments → session lifecycle → stat and achievement caches,
//! all over one [`RemoteSessionProvider`].

use std::sync::Arc;

use lanyard_protocol::UserInfo;
use lanyard_session::{
    Event, Host, Identity, LaunchArgs, SessionConfig, SessionLifecycle,
    SessionLifecycleBuilder, SessionState,
};
use lanyard_sync::{AchievementCache, StatCache, SyncConfig};
use lanyard_transport::{HttpConfig, HttpProvider, RemoteSessionProvider};
use tokio::sync::broadcast;
use tracing::info;

use crate::LanyardError;

/// Builder for a [`Lanyard`] client.
///
/// # Example
///
/// ```rust,ignore
/// use lanyard::prelude::*;
///
/// let lanyard = Lanyard::builder()
///     .session_config(SessionConfig::default())
///     .build_http(HttpConfig::default(), ProcessHost)?;
/// lanyard.authenticate(Identity::game("my-game")).await?;
/// ```
#[derive(Debug, Default)]
pub struct LanyardBuilder {
    args: Option<LaunchArgs>,
    session_config: SessionConfig,
    sync_config: SyncConfig,
}

impl LanyardBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use these launch arguments instead of the process's own.
    pub fn args(mut self, args: LaunchArgs) -> Self {
        self.args = Some(args);
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn sync_config(mut self, config: SyncConfig) -> Self {
        self.sync_config = config;
        self
    }

    /// Builds the client over any provider.
    pub fn build<P: RemoteSessionProvider>(self, provider: P, host: impl Host) -> Lanyard<P> {
        let mut session = SessionLifecycleBuilder::new().config(self.session_config);
        if let Some(args) = self.args {
            session = session.args(args);
        }
        let session = session.build_shared(Arc::new(provider), Arc::new(host));

        Lanyard {
            stats: StatCache::new(session.clone(), self.sync_config.clone()),
            achievements: AchievementCache::new(session.clone(), self.sync_config),
            session,
        }
    }

    /// Builds the client over the loopback HTTP provider.
    pub fn build_http(
        self,
        http: HttpConfig,
        host: impl Host,
    ) -> Result<Lanyard<HttpProvider>, LanyardError> {
        let provider = HttpProvider::new(http)?;
        Ok(self.build(provider, host))
    }
}

/// A game's handle to its companion session.
///
/// Clones share the same session and caches.
pub struct Lanyard<P> {
    session: SessionLifecycle<P>,
    stats: StatCache<P>,
    achievements: AchievementCache<P>,
}

impl<P> Clone for Lanyard<P> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            stats: self.stats.clone(),
            achievements: self.achievements.clone(),
        }
    }
}

impl Lanyard<HttpProvider> {
    pub fn builder() -> LanyardBuilder {
        LanyardBuilder::new()
    }
}

impl<P: RemoteSessionProvider> Lanyard<P> {
    /// Start validation. See [`SessionLifecycle::init`].
    pub fn init(&self, identity: Identity) -> bool {
        self.session.init(identity)
    }

    /// `init` and wait for the outcome.
    ///
    /// On failure the process is already scheduled to terminate; the error
    /// is for logging what went wrong.
    pub async fn authenticate(&self, identity: Identity) -> Result<(), LanyardError> {
        self.session.init(identity);
        match self.session.settled().await {
            SessionState::Authenticated if self.session.is_authenticated() => {
                info!(
                    game_id = ?self.session.game_id(),
                    "lanyard ready"
                );
                Ok(())
            }
            state => Err(LanyardError::NotAuthenticated {
                state,
                message: self
                    .session
                    .last_error()
                    .unwrap_or_else(|| "session shut down".to_string()),
            }),
        }
    }

    /// Stop the session. In-flight cache calls finish as no-ops.
    pub fn shutdown(&self) {
        self.session.shutdown();
    }

    pub fn session(&self) -> &SessionLifecycle<P> {
        &self.session
    }

    pub fn stats(&self) -> &StatCache<P> {
        &self.stats
    }

    pub fn achievements(&self) -> &AchievementCache<P> {
        &self.achievements
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.session.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn game_id(&self) -> Option<String> {
        self.session.game_id()
    }

    pub fn user_id(&self) -> Option<String> {
        self.session.user_id()
    }

    pub fn last_error(&self) -> Option<String> {
        self.session.last_error()
    }

    pub async fn user_info(&self) -> Result<UserInfo, LanyardError> {
        Ok(self.session.user_info().await?)
    }
}
