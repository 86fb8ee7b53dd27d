//! Maps live connections to identities and channel memberships.
//!
//! The registry is shared mutable state touched from every connection's
//! handler task. All operations are short in-memory map updates behind one
//! mutex; none of them suspend, and no lock is ever held across an await.
//! `unregister` removes every trace of a connection in one atomic step so
//! a disconnect can never leave phantom channel membership behind.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use parley_types::channel::ChannelKey;
use parley_types::id::{ConnectionId, UserId};

#[derive(Default)]
struct ConnectionRecord {
    user: Option<UserId>,
    channels: HashSet<ChannelKey>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionRecord>,
    channels: HashMap<ChannelKey, HashSet<ConnectionId>>,
    user_connections: HashMap<UserId, HashSet<ConnectionId>>,
}

/// Registry of live connections, their bound users, and channel membership.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<RegistryInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation is a single guarded step, so a panic mid-update cannot
    // leave the maps half-written; recovering from poison is safe.
    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an unauthenticated record for a freshly accepted connection.
    pub fn register(&self, connection: ConnectionId) {
        self.lock().connections.entry(connection).or_default();
    }

    /// Bind a user identity to a connection.
    ///
    /// Idempotent for the same user. Re-identifying as a different user
    /// rebinds the connection and migrates the live-connection accounting;
    /// channel memberships joined under the old identity are kept (they
    /// address connections, not users).
    pub fn identify(&self, connection: ConnectionId, user: &UserId) {
        let mut inner = self.lock();
        let Some(record) = inner.connections.get_mut(&connection) else {
            return;
        };
        if record.user.as_ref() == Some(user) {
            return;
        }
        let previous = record.user.replace(user.clone());
        if let Some(old) = previous {
            tracing::debug!(connection = %connection, old = %old, new = %user, "connection rebound");
            remove_user_connection(&mut inner.user_connections, &old, connection);
        }
        inner
            .user_connections
            .entry(user.clone())
            .or_default()
            .insert(connection);
    }

    /// Join the conversation channel with `partner`, or the user's solo
    /// channel when no partner is given.
    ///
    /// Silent no-op when the connection was never identified -- callers
    /// are expected to identify before joining.
    pub fn join_conversation(
        &self,
        connection: ConnectionId,
        user: &UserId,
        partner: Option<&UserId>,
    ) {
        let key = match partner {
            Some(partner) => ChannelKey::conversation(user, partner),
            None => ChannelKey::solo(user),
        };
        let mut inner = self.lock();
        let Some(record) = inner.connections.get_mut(&connection) else {
            return;
        };
        if record.user.is_none() {
            tracing::debug!(connection = %connection, channel = %key, "join before identify ignored");
            return;
        }
        record.channels.insert(key.clone());
        inner.channels.entry(key).or_default().insert(connection);
    }

    /// Current subscribers of a channel; empty when nobody joined.
    ///
    /// Returns a snapshot -- broadcasting to it races benignly with
    /// concurrent joins/disconnects, which at-least-once delivery allows.
    pub fn members_of(&self, key: &ChannelKey) -> Vec<ConnectionId> {
        self.lock()
            .channels
            .get(key)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The user bound to a connection, if it has identified.
    pub fn bound_user(&self, connection: ConnectionId) -> Option<UserId> {
        self.lock()
            .connections
            .get(&connection)
            .and_then(|record| record.user.clone())
    }

    /// Remove the connection and all its channel memberships in one step.
    ///
    /// Returns the user that had been bound, so the caller can decide
    /// whether this was the user's last live connection.
    pub fn unregister(&self, connection: ConnectionId) -> Option<UserId> {
        let mut inner = self.lock();
        let record = inner.connections.remove(&connection)?;
        for key in &record.channels {
            if let Some(members) = inner.channels.get_mut(key) {
                members.remove(&connection);
                if members.is_empty() {
                    inner.channels.remove(key);
                }
            }
        }
        if let Some(user) = &record.user {
            remove_user_connection(&mut inner.user_connections, user, connection);
        }
        record.user
    }

    /// How many live connections the user currently has.
    pub fn live_connection_count(&self, user: &UserId) -> usize {
        self.lock()
            .user_connections
            .get(user)
            .map(HashSet::len)
            .unwrap_or(0)
    }
}

fn remove_user_connection(
    user_connections: &mut HashMap<UserId, HashSet<ConnectionId>>,
    user: &UserId,
    connection: ConnectionId,
) {
    if let Some(connections) = user_connections.get_mut(user) {
        connections.remove(&connection);
        if connections.is_empty() {
            user_connections.remove(user);
        }
    }
}
