//! The achievement cache.
//!
//! Unlocks go to the companion first and are recorded locally only once
//! it confirms them. Progress below 100% never leaves the process; it is
//! a UI signal delivered as [`Event::AchievementProgress`].
//!
//! # Unlocks are sticky
//!
//! `get_all` replaces the whole cache with the companion's list, which can
//! lag behind an unlock the companion already confirmed. An entry that was
//! unlocked before the replace stays unlocked when the list reports it
//! locked. Ids confirmed by [`AchievementCache::unlock`] in this process
//! are also kept when the list omits them entirely; other ids missing from
//! the list are dropped. Only
//! [`clear_cache`](AchievementCache::clear_cache) forgets unlocks.
//!
//! Listed progress is clamped to `0.0..=1.0`, and a listed entry at full
//! progress is stored as unlocked.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lanyard_protocol::AchievementRecord;
use lanyard_session::{Event, SessionLifecycle};
use lanyard_transport::RemoteSessionProvider;
use tracing::{debug, info, warn};

use crate::{SyncConfig, SyncError};

#[derive(Default)]
struct State {
    entries: HashMap<String, AchievementRecord>,
    /// Ids whose unlock the companion confirmed.
    confirmed: HashSet<String>,
}

/// Local view of the user's achievements.
///
/// Clones share the same cache.
pub struct AchievementCache<P> {
    session: SessionLifecycle<P>,
    config: SyncConfig,
    state: Arc<Mutex<State>>,
}

impl<P> Clone for AchievementCache<P> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

/// Clamp progress into `0.0..=1.0`; NaN counts as no progress.
fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

impl<P: RemoteSessionProvider> AchievementCache<P> {
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

    /// Unlock `id` on the companion, then locally.
    ///
    /// An id the cache has never seen gets a new entry. On failure the
    /// cache is untouched and nothing is retried.
    pub async fn unlock(&self, id: &str) -> Result<(), SyncError> {
        self.require_session()?;

        self.config
            .bounded(self.session.provider().unlock_achievement(id))
            .await
            .inspect_err(|e| warn!(id, error = %e, "achievement unlock failed"))?;
        self.require_session()?;

        {
            let mut state = self.lock();
            let entry = state
                .entries
                .entry(id.to_string())
                .or_insert_with(|| AchievementRecord::unlocked_now(id));
            mark_unlocked(entry);
            state.confirmed.insert(id.to_string());
        }

        info!(id, "achievement unlocked");
        self.session
            .events()
            .emit(Event::AchievementUnlocked { id: id.to_string() });
        Ok(())
    }

    /// Report progress towards `id`.
    ///
    /// `progress` is clamped to `0.0..=1.0`. At `1.0` this is exactly
    /// [`unlock`](Self::unlock). Below that it only fires
    /// [`Event::AchievementProgress`]; nothing is sent or stored.
    pub async fn set_progress(&self, id: &str, progress: f32) -> Result<(), SyncError> {
        let progress = clamp_progress(progress);
        if progress >= 1.0 {
            return self.unlock(id).await;
        }
        self.require_session()?;

        debug!(id, progress, "achievement progress");
        self.session.events().emit(Event::AchievementProgress {
            id: id.to_string(),
            progress,
        });
        Ok(())
    }

    /// Fetch the authoritative list and replace the cache with it.
    ///
    /// Returns the cache contents after the replace, sorted by id, which
    /// differ from the raw list only by sticky unlocks and normalized
    /// progress. Fires no event.
    pub async fn get_all(&self) -> Result<Vec<AchievementRecord>, SyncError> {
        self.require_session()?;

        let list = self
            .config
            .bounded(self.session.provider().list_achievements())
            .await
            .inspect_err(|e| warn!(error = %e, "achievement list failed"))?;
        self.require_session()?;

        let mut state = self.lock();
        let mut entries: HashMap<String, AchievementRecord> = list
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();

        for (id, listed) in entries.iter_mut() {
            normalize(listed);
            if listed.unlocked {
                continue;
            }
            if let Some(previous) = state.entries.get(id).filter(|p| p.unlocked) {
                debug!(id = %id, "keeping unlock the list reports locked");
                listed.unlocked_at = previous.unlocked_at;
                mark_unlocked(listed);
            }
        }
        for id in &state.confirmed {
            if entries.contains_key(id) {
                continue;
            }
            if let Some(previous) = state.entries.get(id) {
                entries.insert(id.clone(), previous.clone());
            }
        }
        state.entries = entries;

        let mut snapshot: Vec<_> = state.entries.values().cloned().collect();
        drop(state);
        snapshot.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(count = snapshot.len(), "achievements replaced");
        Ok(snapshot)
    }

    /// Local lookup; unseen ids are locked.
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.lock().entries.get(id).is_some_and(|a| a.unlocked)
    }

    pub fn get(&self, id: &str) -> Option<AchievementRecord> {
        self.lock().entries.get(id).cloned()
    }

    /// Every cached achievement, sorted by id.
    pub fn snapshot(&self) -> Vec<AchievementRecord> {
        let mut all: Vec<_> = self.lock().entries.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Empty the local cache, including sticky unlocks. Remote state is
    /// untouched.
    pub fn clear_cache(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.confirmed.clear();
        debug!("achievement cache cleared");
    }
}

/// Clamp listed progress; full progress is an unlock.
fn normalize(record: &mut AchievementRecord) {
    let progress = record.progress.map(clamp_progress);
    if record.unlocked {
        record.progress = None;
    } else if progress.is_some_and(|p| p >= 1.0) {
        mark_unlocked(record);
    } else {
        record.progress = progress;
    }
}

fn mark_unlocked(entry: &mut AchievementRecord) {
    if entry.unlocked_at.is_none() {
        entry.unlocked_at = AchievementRecord::unlocked_now(entry.id.as_str()).unlocked_at;
    }
    entry.unlocked = true;
    entry.progress = None;
}
