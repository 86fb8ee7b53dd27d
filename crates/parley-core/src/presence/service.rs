//! Presence service: transitions, persistence, and status broadcasts.
//!
//! The in-memory transition always wins. Writing `status`/`last_seen`
//! through the user store is best-effort: a store failure or an unknown
//! user row is logged and the transition (and its broadcast) stands --
//! presence is not a durability guarantee.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use parley_types::error::RepositoryError;
use parley_types::event::ServerEvent;
use parley_types::id::UserId;
use parley_types::presence::{PresenceStatus, User};

use crate::hub::BroadcastHub;
use crate::presence::tracker::PresenceTracker;
use crate::repository::UserRepository;

/// Orchestrates the presence tracker, the user store, and the hub.
pub struct PresenceService<U: UserRepository> {
    tracker: PresenceTracker,
    users: U,
    hub: Arc<BroadcastHub>,
}

impl<U: UserRepository> PresenceService<U> {
    pub fn new(users: U, hub: Arc<BroadcastHub>) -> Self {
        Self {
            tracker: PresenceTracker::new(),
            users,
            hub,
        }
    }

    /// Handle an explicit online signal from one of the user's connections.
    ///
    /// Broadcasts `updateUserStatus` to every live connection, but only on
    /// an actual offline -> online transition.
    pub async fn mark_online(&self, user: &UserId) {
        let now = Utc::now();
        if self.tracker.mark_online(user, now) {
            self.hub.to_all(&ServerEvent::UpdateUserStatus {
                user_id: user.clone(),
                status: PresenceStatus::Online,
                last_seen: now,
            });
            debug!(user = %user, "user came online");
        }
        self.persist(user, PresenceStatus::Online, now).await;
    }

    /// Re-evaluate presence after one of the user's connections went away.
    ///
    /// `remaining` is the live connection count after the registry removed
    /// the disconnecting connection; only zero flips the user offline.
    pub async fn handle_disconnect(&self, user: &UserId, remaining: usize) {
        let now = Utc::now();
        if !self
            .tracker
            .mark_offline_if_last_connection(user, remaining, now)
        {
            return;
        }
        self.hub.to_all(&ServerEvent::UpdateUserStatus {
            user_id: user.clone(),
            status: PresenceStatus::Offline,
            last_seen: now,
        });
        debug!(user = %user, "user went offline");
        self.persist(user, PresenceStatus::Offline, now).await;
    }

    /// Heartbeat from a live connection: refresh `last_seen` only.
    pub async fn heartbeat(&self, user: &UserId) {
        let now = Utc::now();
        self.tracker.touch(user, now);
        if let Err(err) = self.users.touch_last_seen(user, now).await {
            log_store_failure(user, "touch_last_seen", &err);
        }
    }

    /// Current presence: the in-memory record when the process has seen the
    /// user, otherwise whatever the user store remembers.
    pub async fn presence_of(
        &self,
        user: &UserId,
    ) -> Result<Option<(PresenceStatus, Option<DateTime<Utc>>)>, RepositoryError> {
        if let Some(record) = self.tracker.snapshot(user) {
            return Ok(Some((record.status, Some(record.last_seen))));
        }
        let row: Option<User> = self.users.find_user(user).await?;
        Ok(row.map(|u| (u.status, u.last_seen)))
    }

    async fn persist(&self, user: &UserId, status: PresenceStatus, now: DateTime<Utc>) {
        if let Err(err) = self.users.set_status(user, status).await {
            log_store_failure(user, "set_status", &err);
        }
        if let Err(err) = self.users.touch_last_seen(user, now).await {
            log_store_failure(user, "touch_last_seen", &err);
        }
    }
}

fn log_store_failure(user: &UserId, op: &str, err: &RepositoryError) {
    match err {
        RepositoryError::NotFound => {
            debug!(user = %user, op, "presence persist skipped, no such user row")
        }
        other => warn!(user = %user, op, error = %other, "presence persist failed"),
    }
}
