//! Lifecycle and sync events.
//!
//! Events go out on a `tokio::sync::broadcast` channel: every receiver
//! obtained from [`EventBus::subscribe`] sees each event once, and dropping
//! the receiver is how a listener unsubscribes. Emitting with no listeners
//! is not an error.

use tokio::sync::broadcast;
use tracing::trace;

/// Something observable happened to the session or one of its caches.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Validation settled. Fired exactly once per process.
    AuthenticationComplete { success: bool },
    /// The liveness monitor lost the companion.
    CompanionDisconnected { reason: String },
    StatsReceived,
    StatsStored,
    StatsStoreFailed { message: String },
    AchievementUnlocked { id: String },
    /// Local-only progress below 100%.
    AchievementProgress { id: String, progress: f32 },
}

/// Fan-out of [`Event`]s to any number of listeners.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: Event) {
        trace!(?event, listeners = self.tx.receiver_count(), "event");
        // No listeners is fine.
        let _ = self.tx.send(event);
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
