//! Collapses a user's message history into one summary row per partner.
//!
//! A pure read over the message store: no mutation, no hidden state, safe
//! to call concurrently. Re-running over unchanged data yields an identical
//! result. Errors fail closed -- the caller gets an error, never a partial
//! list that the UI would mistake for an empty chat history.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parley_types::error::RelayError;
use parley_types::id::UserId;
use parley_types::message::{ChatSummary, Message};

use crate::repository::MessageRepository;

/// Read-side service for chat lists and conversation views.
pub struct SummaryService<M: MessageRepository> {
    messages: M,
}

impl<M: MessageRepository> SummaryService<M> {
    pub fn new(messages: M) -> Self {
        Self { messages }
    }

    /// One entry per distinct partner the user has ever exchanged a message
    /// with, most recent conversation first.
    pub async fn summarize(&self, user: &UserId) -> Result<Vec<ChatSummary>, RelayError> {
        let messages = self.messages.messages_touching(user).await?;
        Ok(fold_summaries(user, messages))
    }

    /// Full message history with one partner, oldest first.
    pub async fn conversation(
        &self,
        user: &UserId,
        partner: &UserId,
    ) -> Result<Vec<Message>, RelayError> {
        Ok(self.messages.conversation(user, partner).await?)
    }
}

/// Group by partner, pick the newest message per group, count the unread.
///
/// `unread_count` counts only messages where `user` is the receiver and the
/// read flag is still false -- the partner's unread messages are *their*
/// count, not a seen-receipt for this user. Result ordering: `last_message`
/// timestamp descending, ties broken by partner id ascending. Within a
/// group, equal timestamps are broken by message id (v7 ids are
/// time-sortable, so this stays deterministic regardless of scan order).
pub fn fold_summaries(user: &UserId, messages: Vec<Message>) -> Vec<ChatSummary> {
    let mut by_partner: HashMap<UserId, (Message, u64)> = HashMap::new();

    for message in messages {
        let partner = if &message.sender == user {
            message.receiver.clone()
        } else {
            message.sender.clone()
        };
        let unread = u64::from(&message.receiver == user && !message.read);

        match by_partner.entry(partner) {
            Entry::Occupied(mut entry) => {
                let (last, count) = entry.get_mut();
                *count += unread;
                if (message.created_at, message.id) > (last.created_at, last.id) {
                    *last = message;
                }
            }
            Entry::Vacant(entry) => {
                entry.insert((message, unread));
            }
        }
    }

    let mut summaries: Vec<ChatSummary> = by_partner
        .into_iter()
        .map(|(partner, (last_message, unread_count))| ChatSummary {
            partner,
            last_message,
            unread_count,
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.last_message
            .created_at
            .cmp(&a.last_message.created_at)
            .then_with(|| a.partner.cmp(&b.partner))
    });
    summaries
}
