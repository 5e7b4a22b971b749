//! The session lifecycle: the one state machine of this crate.
//!
//! [`SessionLifecycle`] owns the process's [`Session`]. It turns launch
//! arguments into credentials, validates them once, runs the liveness
//! monitor while authenticated, and asks the [`Host`] to end the process
//! when authentication fails or the companion goes away.
//!
//! # Concurrency
//!
//! The handle is cheap to clone and every clone drives the same session.
//! Validation and the liveness monitor run as Tokio tasks, so all session
//! state lives behind one `std::sync::Mutex` that is never held across an
//! `.await`. Completions re-check `shut_down` under that lock, which makes
//! anything finishing after [`shutdown`](SessionLifecycle::shutdown) a no-op.
//!
//! # Termination
//!
//! ```text
//! Failed        → Host::terminate after `termination_grace`
//! Disconnected  → Host::terminate immediately
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lanyard_heartbeat::{Heartbeat, HeartbeatMetrics, ProbeOutcome};
use lanyard_protocol::{CompanionEndpoint, Notification, UserInfo};
use lanyard_transport::{RemoteSessionProvider, TransportError};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::credentials::{Credentials, Identity, LaunchArgs};
use crate::events::{Event, EventBus};
use crate::host::{ExitReason, Host};
use crate::session::{Session, SessionConfig, SessionState};
use crate::SessionError;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Slot {
    session: Session,
    /// What the first `init` returned. `Some` makes later calls no-ops.
    outcome: Option<bool>,
    shut_down: bool,
    monitor: Option<JoinHandle<()>>,
    liveness: HeartbeatMetrics,
}

struct Inner<P> {
    provider: Arc<P>,
    host: Arc<dyn Host>,
    config: SessionConfig,
    args: LaunchArgs,
    events: EventBus,
    slot: Mutex<Slot>,
    /// Mirrors `slot.session.state` for [`SessionLifecycle::settled`].
    state_tx: watch::Sender<SessionState>,
}

impl<P: RemoteSessionProvider> Inner<P> {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, slot: &mut Slot, next: SessionState) {
        let previous = slot.session.state;
        slot.session.state = next;
        self.state_tx.send_replace(next);
        debug!(from = %previous, to = %next, "session state changed");
    }

    /// Enter `Failed`, announce it, and schedule termination.
    fn fail(&self, slot: &mut Slot, err: SessionError) {
        let message = err.to_string();
        error!(error = %message, "session authentication failed");

        slot.session.last_error = Some(message.clone());
        self.set_state(slot, SessionState::Failed);
        self.events
            .emit(Event::AuthenticationComplete { success: false });
        self.schedule_exit(ExitReason::AuthenticationFailed(message));
    }

    fn schedule_exit(&self, reason: ExitReason) {
        let host = Arc::clone(&self.host);
        let code = self.config.exit_code;
        let grace = self.config.termination_grace;
        info!(?grace, %reason, "process termination scheduled");

        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    time::sleep(grace).await;
                    host.terminate(code, &reason);
                });
            }
            // No runtime to sleep on: fall back to a plain thread.
            Err(_) => {
                std::thread::spawn(move || {
                    std::thread::sleep(grace);
                    host.terminate(code, &reason);
                });
            }
        }
    }

    async fn validate(self: Arc<Self>, credentials: Credentials) {
        let limit = self.config.validation_timeout;
        let request = credentials.request();
        let call = self
            .provider
            .validate(credentials.endpoint.as_ref(), &request);

        let result = match time::timeout(limit, call).await {
            Ok(Ok(reply)) => reply
                .check()
                .map(|()| reply)
                .map_err(|e| SessionError::Transport(e.into())),
            Ok(Err(e)) => Err(SessionError::from_validation(e)),
            Err(_) => Err(SessionError::Transport(TransportError::Timeout(limit))),
        };

        let mut slot = self.lock();
        if slot.shut_down {
            debug!("validation finished after shutdown, ignoring");
            return;
        }

        match result {
            Ok(reply) => {
                info!(
                    game_id = %reply.game_id,
                    user_id = %reply.user_id,
                    "session authenticated"
                );
                slot.session.game_id = Some(reply.game_id);
                slot.session.user_id = Some(reply.user_id);
                self.set_state(&mut slot, SessionState::Authenticated);
                self.events
                    .emit(Event::AuthenticationComplete { success: true });

                let monitor = tokio::spawn(Arc::clone(&self).monitor());
                slot.monitor = Some(monitor);
            }
            Err(err) => self.fail(&mut slot, err),
        }
    }

    /// Probe the companion on every beat until one probe fails.
    async fn monitor(self: Arc<Self>) {
        let mut heartbeat = Heartbeat::new(self.config.liveness.clone());
        if !heartbeat.is_enabled() {
            debug!("liveness monitor disabled");
            return;
        }
        debug!(interval = ?heartbeat.interval(), "liveness monitor started");

        let cause = loop {
            let beat = heartbeat.wait_for_beat().await;
            let outcome = heartbeat.run_probe(self.provider.check_liveness()).await;
            self.lock().liveness = heartbeat.metrics().clone();
            match outcome {
                ProbeOutcome::Passed(()) => continue,
                ProbeOutcome::Failed(e) => break (beat.beat, e),
                ProbeOutcome::TimedOut(limit) => {
                    break (beat.beat, TransportError::Timeout(limit));
                }
            }
        };
        let (beat, err) = cause;
        let message = format!("liveness check failed: {err}");

        {
            let mut slot = self.lock();
            if slot.shut_down || slot.session.state != SessionState::Authenticated {
                return;
            }
            warn!(beat, error = %err, "companion lost");
            slot.session.last_error = Some(message.clone());
            self.set_state(&mut slot, SessionState::Disconnected);
            // Our own handle; nothing left to cancel.
            slot.monitor = None;
            self.events.emit(Event::CompanionDisconnected {
                reason: message.clone(),
            });
        }

        self.host.terminate(
            self.config.exit_code,
            &ExitReason::CompanionDisconnected(message),
        );
    }
}

// ---------------------------------------------------------------------------
// SessionLifecycle
// ---------------------------------------------------------------------------

/// Handle to the process's session. See the module docs.
pub struct SessionLifecycle<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for SessionLifecycle<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: RemoteSessionProvider> SessionLifecycle<P> {
    /// Lifecycle with default config and the current process arguments.
    pub fn new(provider: P, host: impl Host) -> Self {
        SessionLifecycleBuilder::new().build(provider, host)
    }

    /// Parse the launch arguments and start validation.
    ///
    /// Returns `true` if validation was started. The validation result is
    /// only reported through [`Event::AuthenticationComplete`] (or awaited
    /// with [`settled`](Self::settled)). Returns `false` when credentials
    /// are missing; the session is then `Failed` and no remote call is
    /// made.
    ///
    /// Only the first call does anything. Later calls return what the
    /// first one returned.
    pub fn init(&self, identity: Identity) -> bool {
        let inner = &self.inner;
        let mut slot = inner.lock();

        if let Some(outcome) = slot.outcome {
            debug!(outcome, state = %slot.session.state, "init already ran");
            return outcome;
        }
        if slot.shut_down {
            warn!("init called after shutdown, ignoring");
            return false;
        }

        let parsed = Credentials::resolve(
            &identity,
            &inner.args,
            inner.provider.requirements(),
        );
        inner.set_state(&mut slot, SessionState::ArgsParsed);

        let credentials = match parsed {
            Ok(credentials) => credentials,
            Err(err) => {
                slot.outcome = Some(false);
                inner.fail(&mut slot, err);
                return false;
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            slot.outcome = Some(false);
            inner.fail(&mut slot, SessionError::NoRuntime);
            return false;
        };

        slot.session.raw_token = credentials.token.clone();
        slot.session.companion = credentials.endpoint.clone();
        inner.set_state(&mut slot, SessionState::Validating);
        slot.outcome = Some(true);
        info!(
            identity = ?credentials.identity,
            companion = ?credentials.endpoint,
            "validating session"
        );
        drop(slot);

        runtime.spawn(Arc::clone(inner).validate(credentials));
        true
    }

    /// Stop the session. Callable in any state, and idempotent.
    ///
    /// The liveness monitor is cancelled before this returns, so no
    /// `CompanionDisconnected` can follow a deliberate shutdown. If the
    /// session was authenticated the companion is told it ended.
    pub fn shutdown(&self) {
        let mut slot = self.inner.lock();
        if slot.shut_down {
            return;
        }
        slot.shut_down = true;
        if let Some(monitor) = slot.monitor.take() {
            monitor.abort();
            debug!("liveness monitor cancelled");
        }
        let ended = match (slot.session.state, &slot.session.game_id) {
            (SessionState::Authenticated, Some(game_id)) => Some(game_id.clone()),
            _ => None,
        };
        drop(slot);

        if let Some(game_id) = ended {
            self.inner
                .provider
                .notify(Notification::SessionEnded { game_id });
        }
        // Wake anyone waiting in `settled`.
        self.inner.state_tx.send_modify(|_| {});
        info!("session shut down");
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().session.state
    }

    /// `true` while authenticated and not shut down.
    pub fn is_authenticated(&self) -> bool {
        let slot = self.inner.lock();
        !slot.shut_down && slot.session.is_authenticated()
    }

    /// `true` after a successful `init` and before `shutdown`.
    pub fn is_initialized(&self) -> bool {
        let slot = self.inner.lock();
        !slot.shut_down && slot.outcome == Some(true)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.lock().shut_down
    }

    /// Latency and failure counts of the liveness probes run so far.
    pub fn liveness_metrics(&self) -> HeartbeatMetrics {
        self.inner.lock().liveness.clone()
    }

    pub fn user_id(&self) -> Option<String> {
        let slot = self.inner.lock();
        if slot.shut_down {
            return None;
        }
        slot.session.user_id().map(str::to_string)
    }

    pub fn game_id(&self) -> Option<String> {
        let slot = self.inner.lock();
        if slot.shut_down {
            return None;
        }
        slot.session.game_id().map(str::to_string)
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().session.last_error.clone()
    }

    pub fn companion(&self) -> Option<CompanionEndpoint> {
        self.inner.lock().session.companion.clone()
    }

    /// A copy of the session as it is right now.
    pub fn snapshot(&self) -> Session {
        self.inner.lock().session.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    /// The bus the caches emit their events on.
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.inner.provider
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Waits until the session is authenticated, failed, disconnected or
    /// shut down, and returns the state at that point.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.inner.state_tx.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            if state.is_settled() || self.is_shut_down() {
                return state;
            }
            if rx.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// The authenticated user's profile from the companion.
    pub async fn user_info(&self) -> Result<UserInfo, SessionError> {
        if !self.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        let limit = self.inner.config.validation_timeout;
        let info = time::timeout(limit, self.inner.provider.user_info())
            .await
            .map_err(|_| TransportError::Timeout(limit))??;

        if !self.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        Ok(info)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`SessionLifecycle`].
#[derive(Debug, Default)]
pub struct SessionLifecycleBuilder {
    args: Option<LaunchArgs>,
    config: Option<SessionConfig>,
}

impl SessionLifecycleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use these launch arguments instead of the process's own.
    pub fn args(mut self, args: LaunchArgs) -> Self {
        self.args = Some(args);
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build<P: RemoteSessionProvider>(
        self,
        provider: P,
        host: impl Host,
    ) -> SessionLifecycle<P> {
        self.build_shared(Arc::new(provider), Arc::new(host))
    }

    /// Like [`build`](Self::build) for a provider and host that are
    /// already shared.
    pub fn build_shared<P: RemoteSessionProvider>(
        self,
        provider: Arc<P>,
        host: Arc<dyn Host>,
    ) -> SessionLifecycle<P> {
        let config = self.config.unwrap_or_default().validated();
        let args = self.args.unwrap_or_else(LaunchArgs::from_env);
        let (state_tx, _) = watch::channel(SessionState::Uninitialized);

        SessionLifecycle {
            inner: Arc::new(Inner {
                provider,
                host,
                events: EventBus::new(config.event_capacity),
                config,
                args,
                slot: Mutex::new(Slot::default()),
                state_tx,
            }),
        }
    }
}
