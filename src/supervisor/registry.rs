//! Registry of connection sessions, keyed by account id. The registry is the
//! sole authority on session liveness: at most one entry (live or cooling
//! down) exists per account at any instant. All operations are single map
//! mutations under one mutex; nothing awaits while holding it.

use crate::model::AccountId;
use crate::supervisor::session::{SessionGeneration, SessionState};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct SessionEntry {
    generation: SessionGeneration,
    state: SessionState,
    started_at: Instant,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<AccountId, SessionEntry>>,
    next_generation: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the account's slot and returns the new session generation,
    /// or `None` when a session (live or cooling down) already exists.
    pub fn reserve(
        &self,
        account: &AccountId,
        cancel: CancellationToken,
    ) -> Option<SessionGeneration> {
        let mut sessions = self.lock();
        if sessions.contains_key(account) {
            return None;
        }

        let generation =
            SessionGeneration::new(self.next_generation.fetch_add(1, Ordering::Relaxed));
        sessions.insert(
            account.clone(),
            SessionEntry {
                generation,
                state: SessionState::Streaming,
                started_at: Instant::now(),
                cancel,
            },
        );
        Some(generation)
    }

    /// Removes the session only when the registry still references the same
    /// reservation. Returns whether a removal happened.
    pub fn remove_if_current(&self, account: &AccountId, generation: SessionGeneration) -> bool {
        let mut sessions = self.lock();
        match sessions.get(account) {
            Some(entry) if entry.generation == generation => {
                sessions.remove(account);
                true
            }
            _ => false,
        }
    }

    /// Flips the session into the cooling-down state, keeping the slot
    /// occupied so the account is not re-sampled. Returns `false` when the
    /// reservation is no longer current.
    pub fn mark_cooling_down(&self, account: &AccountId, generation: SessionGeneration) -> bool {
        let mut sessions = self.lock();
        match sessions.get_mut(account) {
            Some(entry) if entry.generation == generation => {
                entry.state = SessionState::CoolingDown;
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.lock().contains_key(account)
    }

    pub fn state_of(&self, account: &AccountId) -> Option<SessionState> {
        self.lock().get(account).map(|entry| entry.state)
    }

    pub fn generation_of(&self, account: &AccountId) -> Option<SessionGeneration> {
        self.lock().get(account).map(|entry| entry.generation)
    }

    pub fn started_at(&self, account: &AccountId) -> Option<Instant> {
        self.lock().get(account).map(|entry| entry.started_at)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Number of sessions that actually hold an open socket (excludes
    /// cooling-down slots).
    pub fn streaming_len(&self) -> usize {
        self.lock()
            .values()
            .filter(|entry| entry.state == SessionState::Streaming)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Ids currently occupying a slot, live or cooling down. This is the
    /// sampler's exclusion set.
    pub fn occupied_ids(&self) -> HashSet<AccountId> {
        self.lock().keys().cloned().collect()
    }

    /// Cancels every current session's token. Used during shutdown to fan
    /// the stop signal out to session tasks that predate the cancel.
    pub(crate) fn cancel_all(&self) {
        for entry in self.lock().values() {
            entry.cancel.cancel();
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AccountId, SessionEntry>> {
        self.sessions.lock().expect("session registry mutex poisoned")
    }
}
