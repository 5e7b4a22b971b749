//! The stat cache: load once, read and write locally, flush on demand.
//!
//! ```text
//! request_stats ──→ [loaded] ──get/set (local only)──→ store_stats
//!                      ↑                                   │
//!                      └──────── dirty flags cleared ──────┘
//! ```
//!
//! Nothing here retries. Stat values are overwrites, not deltas, so a
//! caller that retries `store_stats` after a failure is always safe.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lanyard_protocol::{StatKind, StatRecord, StatValue};
use lanyard_session::{Event, SessionLifecycle};
use lanyard_transport::RemoteSessionProvider;
use tracing::{debug, info, warn};

use crate::{SyncConfig, SyncError};

/// One stat as the cache sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct StatEntry {
    pub id: String,
    pub value: StatValue,
    /// Set locally and not yet confirmed stored.
    pub dirty: bool,
}

impl StatEntry {
    pub fn kind(&self) -> StatKind {
        self.value.kind()
    }
}

struct Tracked {
    entry: StatEntry,
    /// Unique per write, so a store can tell whether an entry changed
    /// while it was in flight.
    revision: u64,
}

#[derive(Default)]
struct State {
    loaded: bool,
    entries: HashMap<String, Tracked>,
    next_revision: u64,
}

impl State {
    fn revision(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }

    /// The current value of a loaded, known stat.
    fn lookup(&self, id: &str) -> Result<StatValue, SyncError> {
        if !self.loaded {
            return Err(SyncError::CacheNotLoaded);
        }
        self.entries
            .get(id)
            .map(|t| t.entry.value)
            .ok_or_else(|| SyncError::UnknownStat(id.to_string()))
    }
}

fn wrong_kind(id: &str, expected: StatKind, actual: StatKind) -> SyncError {
    SyncError::WrongKind {
        id: id.to_string(),
        expected,
        actual,
    }
}

/// Locally cached stats for the session's user.
///
/// Clones share the same cache.
pub struct StatCache<P> {
    session: SessionLifecycle<P>,
    config: SyncConfig,
    state: Arc<Mutex<State>>,
}

impl<P> Clone for StatCache<P> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<P: RemoteSessionProvider> StatCache<P> {
    pub fn new(session: SessionLifecycle<P>, config: SyncConfig) -> Self {
        Self {
            session,
            config: config.validated(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// The session this cache is gated on.
    pub fn session(&self) -> &SessionLifecycle<P> {
        &self.session
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require_session(&self) -> Result<(), SyncError> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(SyncError::NotAuthenticated)
        }
    }

    // -- Remote ----------------------------------------------------------

    /// Fetch every stat and replace the cache with the result.
    ///
    /// On success the cache is marked loaded, `StatsReceived` fires, and
    /// the number of stats is returned. On failure the cache is left as it
    /// was and no event fires. Concurrent calls are independent; the last
    /// reply to arrive wins.
    pub async fn request_stats(&self) -> Result<usize, SyncError> {
        self.require_session()?;

        let records = self
            .config
            .bounded(self.session.provider().request_stats())
            .await
            .inspect_err(|e| warn!(error = %e, "stat request failed"))?;
        self.require_session()?;

        let count = records.len();
        {
            let mut state = self.lock();
            let mut entries = HashMap::with_capacity(count);
            for record in records {
                let revision = state.revision();
                let entry = StatEntry {
                    id: record.id().to_string(),
                    value: record.value(),
                    dirty: false,
                };
                entries.insert(entry.id.clone(), Tracked { entry, revision });
            }
            state.entries = entries;
            state.loaded = true;
        }

        info!(count, "stats received");
        self.session.events().emit(Event::StatsReceived);
        Ok(count)
    }

    /// Send every known stat to the companion.
    ///
    /// On success, entries that were not changed while the store was in
    /// flight stop being dirty and `StatsStored` fires. On failure the
    /// dirty flags stay as they were and `StatsStoreFailed` fires.
    pub async fn store_stats(&self) -> Result<(), SyncError> {
        let (batch, sent) = {
            let state = self.lock();
            if !state.loaded {
                return Err(SyncError::CacheNotLoaded);
            }
            let mut batch = Vec::with_capacity(state.entries.len());
            let mut sent = Vec::with_capacity(state.entries.len());
            for tracked in state.entries.values() {
                batch.push(StatRecord::new(tracked.entry.id.clone(), tracked.entry.value));
                sent.push((tracked.entry.id.clone(), tracked.revision));
            }
            (batch, sent)
        };
        self.require_session()?;

        debug!(count = batch.len(), "storing stats");
        let result = self
            .config
            .bounded(self.session.provider().store_stats(&batch))
            .await;
        self.require_session()?;

        match result {
            Ok(()) => {
                let mut state = self.lock();
                for (id, revision) in sent {
                    if let Some(tracked) = state.entries.get_mut(&id) {
                        if tracked.revision == revision {
                            tracked.entry.dirty = false;
                        }
                    }
                }
                drop(state);
                info!(count = batch.len(), "stats stored");
                self.session.events().emit(Event::StatsStored);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "stat store failed");
                self.session.events().emit(Event::StatsStoreFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    // -- Local -----------------------------------------------------------

    pub fn get_int(&self, id: &str) -> Result<i64, SyncError> {
        match self.lock().lookup(id)? {
            StatValue::Int(v) => Ok(v),
            other => Err(wrong_kind(id, StatKind::Int, other.kind())),
        }
    }

    pub fn get_float(&self, id: &str) -> Result<f64, SyncError> {
        match self.lock().lookup(id)? {
            StatValue::Float(v) => Ok(v),
            other => Err(wrong_kind(id, StatKind::Float, other.kind())),
        }
    }

    pub fn set_int(&self, id: &str, value: i64) -> Result<(), SyncError> {
        self.set(id, StatValue::Int(value))
    }

    pub fn set_float(&self, id: &str, value: f64) -> Result<(), SyncError> {
        self.set(id, StatValue::Float(value))
    }

    /// Overwrite a loaded stat of the same kind and mark it dirty.
    pub fn set(&self, id: &str, value: StatValue) -> Result<(), SyncError> {
        let mut state = self.lock();
        let current = state.lookup(id)?.kind();
        if current != value.kind() {
            return Err(wrong_kind(id, value.kind(), current));
        }
        let revision = state.revision();
        if let Some(tracked) = state.entries.get_mut(id) {
            tracked.entry.value = value;
            tracked.entry.dirty = true;
            tracked.revision = revision;
        }
        debug!(id, ?value, "stat set locally");
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    /// Ids set locally and not yet stored, sorted.
    pub fn dirty_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self
            .lock()
            .entries
            .values()
            .filter(|t| t.entry.dirty)
            .map(|t| t.entry.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn entry(&self, id: &str) -> Option<StatEntry> {
        self.lock().entries.get(id).map(|t| t.entry.clone())
    }

    /// Every cached stat, sorted by id.
    pub fn entries(&self) -> Vec<StatEntry> {
        let mut entries: Vec<_> = self
            .lock()
            .entries
            .values()
            .map(|t| t.entry.clone())
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    /// Forget everything, including the loaded flag. Remote state is
    /// untouched.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.loaded = false;
        debug!("stat cache reset");
    }
}
