//! Message and chat summary types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::id::UserId;

/// A persisted 1:1 chat message.
///
/// Created by the relay on send with a server-assigned timestamp (the
/// server clock is authoritative so summary ordering stays monotonic).
/// Content is never edited after the fact; only the `read` flag is mutated,
/// and only by bulk read-state updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender: UserId,
    pub receiver: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Message {
    /// Build a fresh unread message stamped with the server clock.
    pub fn new(sender: UserId, receiver: UserId, content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            sender,
            receiver,
            content,
            created_at: Utc::now(),
            read: false,
        }
    }
}

/// One row of a user's chat list: the most recent message exchanged with a
/// partner plus how many of the partner's messages are still unread.
///
/// Ephemeral -- recomputed from the message store on every aggregation
/// request, never persisted. `unread_count` counts only messages where the
/// requesting user is the receiver and `read` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub partner: UserId,
    pub last_message: Message,
    pub unread_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_starts_unread() {
        let m = Message::new(UserId::from("a"), UserId::from("b"), "hi".into());
        assert!(!m.read);
        assert_eq!(m.content, "hi");
    }

    #[test]
    fn message_wire_format_is_camel_case() {
        let m = Message::new(UserId::from("a"), UserId::from("b"), "hi".into());
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"sender\":\"a\""));
    }

    #[test]
    fn summary_round_trips() {
        let m = Message::new(UserId::from("a"), UserId::from("b"), "hi".into());
        let s = ChatSummary {
            partner: UserId::from("b"),
            last_message: m,
            unread_count: 3,
        };
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"unreadCount\":3"));
        let back: ChatSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
