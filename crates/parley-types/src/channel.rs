//! Deterministic channel addressing for conversations and per-user channels.
//!
//! Channel keys are derived, never stored. Both participants and the relay
//! compute the identical key for a conversation because the pair is sorted
//! before the key is built: `conversation(a, b) == conversation(b, a)`.
//! The `dm:`/`user:` prefixes keep the two keyspaces disjoint.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Key addressing a set of subscribed connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelKey(String);

impl ChannelKey {
    /// Canonical key for the 1:1 conversation between two users,
    /// invariant under argument order.
    pub fn conversation(a: &UserId, b: &UserId) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("dm:{lo}:{hi}"))
    }

    /// A user's own dedicated channel, for events addressed to "this user
    /// regardless of which conversation" (chat-list refreshes, typing).
    pub fn solo(user: &UserId) -> Self {
        Self(format!("user:{user}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
