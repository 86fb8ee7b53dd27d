//! Per-user presence state machine.
//!
//! A user is online iff at least one of their connections is registered;
//! presence is derived from the union of live connections, never from a
//! single one. Transitions are computed under the tracker's lock, which
//! serializes them per user -- two racing connects/disconnects cannot both
//! observe the same transition.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use parley_types::id::UserId;
use parley_types::presence::{PresenceRecord, PresenceStatus};

/// In-memory user presence map.
#[derive(Default)]
pub struct PresenceTracker {
    inner: Mutex<HashMap<UserId, PresenceRecord>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, PresenceRecord>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an online signal.
    ///
    /// Returns true only on an actual offline -> online transition; a ping
    /// from an already-online user refreshes `last_seen` and reports false,
    /// so callers emit presence-changed events exactly once per transition.
    pub fn mark_online(&self, user: &UserId, now: DateTime<Utc>) -> bool {
        let mut map = self.lock();
        match map.get_mut(user) {
            Some(record) => {
                let transitioned = record.status == PresenceStatus::Offline;
                record.status = PresenceStatus::Online;
                record.last_seen = record.last_seen.max(now);
                transitioned
            }
            None => {
                map.insert(
                    user.clone(),
                    PresenceRecord {
                        status: PresenceStatus::Online,
                        last_seen: now,
                    },
                );
                true
            }
        }
    }

    /// Flip to offline when the disconnecting connection was the last one.
    ///
    /// `remaining` is the user's live connection count after the registry
    /// removed the disconnecting connection. Any other live connection
    /// keeps the user online: no state change, no event.
    pub fn mark_offline_if_last_connection(
        &self,
        user: &UserId,
        remaining: usize,
        now: DateTime<Utc>,
    ) -> bool {
        if remaining > 0 {
            return false;
        }
        let mut map = self.lock();
        let Some(record) = map.get_mut(user) else {
            return false;
        };
        let transitioned = record.status == PresenceStatus::Online;
        record.status = PresenceStatus::Offline;
        record.last_seen = record.last_seen.max(now);
        transitioned
    }

    /// Heartbeat: refresh `last_seen` without touching the status.
    pub fn touch(&self, user: &UserId, now: DateTime<Utc>) {
        let mut map = self.lock();
        if let Some(record) = map.get_mut(user) {
            record.last_seen = record.last_seen.max(now);
        }
    }

    pub fn snapshot(&self, user: &UserId) -> Option<PresenceRecord> {
        self.lock().get(user).copied()
    }
}
