//! The WebSocket event surface.
//!
//! Clients send JSON text frames matching [`ClientCommand`]; the gateway
//! pushes [`ServerEvent`] frames back. Tags and field names are the wire
//! format consumed by the web client, hence the camelCase renames
//! everywhere -- changing any of them is a breaking protocol change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::UserId;
use crate::message::Message;
use crate::presence::PresenceStatus;

/// Incoming command from a WebSocket client.
///
/// Unknown or malformed frames are logged and ignored by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    /// Bind a user identity to this connection.
    Identify { user_id: UserId },
    /// Join the conversation channel with `selected_user_id`, or the
    /// caller's own solo channel when no partner is given.
    JoinRoom {
        user_id: UserId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selected_user_id: Option<UserId>,
    },
    /// Persist and relay a message.
    SendMessage {
        sender: UserId,
        receiver: UserId,
        content: String,
    },
    /// The sender started typing at `receiver_id`.
    Typing {
        sender_id: UserId,
        receiver_id: UserId,
    },
    /// The sender stopped typing.
    StopTyping {
        sender_id: UserId,
        receiver_id: UserId,
    },
    /// Explicit online ping; drives the offline -> online transition.
    UserOnline { user_id: UserId },
    /// Flip every unread message from `selected_user_id` to read.
    MarkMessagesAsRead {
        user_id: UserId,
        selected_user_id: UserId,
    },
    /// Keep-alive. Server responds with `{"type":"pong"}` and refreshes
    /// the bound user's last-seen timestamp.
    Ping,
}

/// Outbound event pushed to subscribed connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A newly persisted message, fanned out to the conversation channel.
    ReceiveMessage { message: Message },
    /// The receiver's chat list is stale and should be refetched.
    RefreshChatList,
    Typing {
        sender_id: UserId,
        receiver_id: UserId,
    },
    StopTyping {
        sender_id: UserId,
        receiver_id: UserId,
    },
    /// Presence transition, broadcast to every live connection.
    UpdateUserStatus {
        user_id: UserId,
        status: PresenceStatus,
        last_seen: DateTime<Utc>,
    },
    /// Reported only to the connection whose command failed.
    ErrorMessage { message: String },
    Pong,
}
