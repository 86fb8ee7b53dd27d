//! Identifier newtypes for users and live connections.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a user.
///
/// User ids are issued by the external auth system and treated as opaque
/// strings here. They must be non-empty; beyond that, validation is the
/// issuer's responsibility. Ordering is lexicographic on the canonical
/// string form, which is what conversation channel keys sort by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is usable at all (non-empty after trimming).
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier for one live connection.
///
/// Minted by the gateway on socket accept (UUID v7, time-sortable) and
/// never persisted; a connection id dies with its socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_validity() {
        assert!(UserId::from("u1").is_valid());
        assert!(!UserId::from("").is_valid());
        assert!(!UserId::from("   ").is_valid());
    }

    #[test]
    fn user_id_orders_lexicographically() {
        assert!(UserId::from("alice") < UserId::from("bob"));
        assert!(UserId::from("user10") < UserId::from("user9"));
    }

    #[test]
    fn user_id_serializes_transparently() {
        let id = UserId::from("u1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u1\"");
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
