//! The relay orchestrates the message store and the broadcast hub.
//!
//! Persistence is the linearization point for "the message happened": a
//! message is broadcast only after the store accepted it, and a store
//! failure aborts the broadcast entirely. A crash between persist and
//! broadcast is a possible false negative (saved, not delivered live); the
//! summary aggregation recovers it on the next chat-list fetch.

use std::sync::Arc;

use tracing::debug;

use parley_types::channel::ChannelKey;
use parley_types::error::RelayError;
use parley_types::event::ServerEvent;
use parley_types::id::UserId;
use parley_types::message::Message;

use crate::hub::BroadcastHub;
use crate::repository::MessageRepository;

/// Relays messages, typing signals, and read receipts to live connections.
pub struct MessageRelay<M: MessageRepository> {
    messages: M,
    hub: Arc<BroadcastHub>,
}

impl<M: MessageRepository> MessageRelay<M> {
    pub fn new(messages: M, hub: Arc<BroadcastHub>) -> Self {
        Self { messages, hub }
    }

    /// Persist a new message, then fan it out.
    ///
    /// The stored message goes to the conversation channel; the receiver's
    /// solo channel additionally gets a chat-list refresh so their summary
    /// view updates even when they have not joined this conversation.
    pub async fn send_message(
        &self,
        sender: &UserId,
        receiver: &UserId,
        content: &str,
    ) -> Result<Message, RelayError> {
        if !sender.is_valid() {
            return Err(RelayError::validation("sender must not be empty"));
        }
        if !receiver.is_valid() {
            return Err(RelayError::validation("receiver must not be empty"));
        }
        if content.trim().is_empty() {
            return Err(RelayError::validation("content must not be empty"));
        }

        // Server-assigned timestamp: the server clock is authoritative so
        // summary ordering stays monotonic regardless of client clocks.
        let message = Message::new(sender.clone(), receiver.clone(), content.to_string());
        self.messages.insert(&message).await?;

        let delivered = self.hub.to_channel(
            &ChannelKey::conversation(sender, receiver),
            &ServerEvent::ReceiveMessage {
                message: message.clone(),
            },
        );
        self.hub
            .to_channel(&ChannelKey::solo(receiver), &ServerEvent::RefreshChatList);
        debug!(
            message = %message.id,
            sender = %sender,
            receiver = %receiver,
            delivered,
            "message relayed"
        );

        Ok(message)
    }

    /// Broadcast a typing / stop-typing signal.
    ///
    /// Purely ephemeral: nothing is persisted and duplicate or out-of-order
    /// delivery is acceptable (last write wins in the receiver's UI).
    pub fn relay_typing(&self, sender: &UserId, receiver: &UserId, is_typing: bool) {
        let event = if is_typing {
            ServerEvent::Typing {
                sender_id: sender.clone(),
                receiver_id: receiver.clone(),
            }
        } else {
            ServerEvent::StopTyping {
                sender_id: sender.clone(),
                receiver_id: receiver.clone(),
            }
        };
        self.hub.to_channel(&ChannelKey::solo(receiver), &event);
        self.hub
            .to_channel(&ChannelKey::conversation(sender, receiver), &event);
    }

    /// Flip everything `partner` sent to `user` to read, then nudge the
    /// user's own chat list.
    ///
    /// Idempotent: with nothing left unread the bulk update touches zero
    /// rows and still succeeds (and still notifies).
    pub async fn mark_read(&self, user: &UserId, partner: &UserId) -> Result<u64, RelayError> {
        let updated = self.messages.mark_conversation_read(user, partner).await?;
        self.hub
            .to_channel(&ChannelKey::solo(user), &ServerEvent::RefreshChatList);
        debug!(user = %user, partner = %partner, updated, "conversation marked read");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    use parley_types::error::RepositoryError;
    use parley_types::id::ConnectionId;
    use crate::session::SessionRegistry;

    /// Message store double backed by a Vec; can be told to fail inserts.
    #[derive(Default)]
    struct FakeMessageRepo {
        rows: Mutex<Vec<Message>>,
        fail_inserts: bool,
    }

    impl MessageRepository for FakeMessageRepo {
        async fn insert(&self, message: &Message) -> Result<(), RepositoryError> {
            if self.fail_inserts {
                return Err(RepositoryError::Query("disk full".into()));
            }
            self.rows.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn mark_conversation_read(
            &self,
            receiver: &UserId,
            sender: &UserId,
        ) -> Result<u64, RepositoryError> {
            let mut rows = self.rows.lock().unwrap();
            let mut updated = 0;
            for row in rows.iter_mut() {
                if &row.sender == sender && &row.receiver == receiver && !row.read {
                    row.read = true;
                    updated += 1;
                }
            }
            Ok(updated)
        }

        async fn conversation(
            &self,
            user: &UserId,
            partner: &UserId,
        ) -> Result<Vec<Message>, RepositoryError> {
            let mut rows: Vec<Message> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|m| {
                    (&m.sender == user && &m.receiver == partner)
                        || (&m.sender == partner && &m.receiver == user)
                })
                .cloned()
                .collect();
            rows.sort_by_key(|m| m.created_at);
            Ok(rows)
        }

        async fn messages_touching(&self, user: &UserId) -> Result<Vec<Message>, RepositoryError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|m| &m.sender == user || &m.receiver == user)
                .cloned()
                .collect())
        }
    }

    fn u(s: &str) -> UserId {
        UserId::from(s)
    }

    struct Peer {
        conn: ConnectionId,
        rx: mpsc::UnboundedReceiver<ServerEvent>,
    }

    impl Peer {
        fn drain(&mut self) -> Vec<ServerEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    fn connect(registry: &SessionRegistry, hub: &BroadcastHub, user: &UserId) -> Peer {
        let conn = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(conn);
        registry.identify(conn, user);
        hub.attach(conn, tx);
        Peer { conn, rx }
    }

    fn relay_fixture(
        repo: FakeMessageRepo,
    ) -> (Arc<SessionRegistry>, Arc<BroadcastHub>, MessageRelay<FakeMessageRepo>) {
        let registry = Arc::new(SessionRegistry::new());
        let hub = Arc::new(BroadcastHub::new(registry.clone()));
        let relay = MessageRelay::new(repo, hub.clone());
        (registry, hub, relay)
    }

    #[tokio::test]
    async fn send_persists_then_delivers_exactly_once() {
        let (registry, _hub, relay) = relay_fixture(FakeMessageRepo::default());
        let mut alice = connect(&registry, &relay.hub, &u("alice"));
        let mut bob = connect(&registry, &relay.hub, &u("bob"));
        registry.join_conversation(alice.conn, &u("alice"), Some(&u("bob")));
        registry.join_conversation(bob.conn, &u("bob"), Some(&u("alice")));
        registry.join_conversation(bob.conn, &u("bob"), None);

        let stored = relay
            .send_message(&u("alice"), &u("bob"), "hello")
            .await
            .unwrap();
        assert!(!stored.read);

        // Bob: exactly one receiveMessage and one refreshChatList.
        let events = bob.drain();
        let receives: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ServerEvent::ReceiveMessage { message } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(receives.len(), 1);
        assert_eq!(receives[0].content, "hello");
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, ServerEvent::RefreshChatList))
                .count(),
            1
        );

        // Alice sees her own message echoed on the conversation channel.
        let events = alice.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ServerEvent::ReceiveMessage { .. }));

        // And the row landed in the store.
        assert_eq!(relay.messages.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn send_to_offline_partner_still_persists() {
        let (_registry, _hub, relay) = relay_fixture(FakeMessageRepo::default());

        let stored = relay
            .send_message(&u("alice"), &u("bob"), "anyone there?")
            .await
            .unwrap();

        assert_eq!(stored.content, "anyone there?");
        assert_eq!(relay.messages.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn validation_failures_never_reach_the_store() {
        let (_registry, _hub, relay) = relay_fixture(FakeMessageRepo::default());

        for (sender, receiver, content) in [
            ("", "bob", "hi"),
            ("alice", "", "hi"),
            ("alice", "bob", ""),
            ("alice", "bob", "   "),
        ] {
            let err = relay
                .send_message(&u(sender), &u(receiver), content)
                .await
                .unwrap_err();
            assert!(matches!(err, RelayError::Validation(_)));
        }
        assert!(relay.messages.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_aborts_the_broadcast() {
        let repo = FakeMessageRepo {
            fail_inserts: true,
            ..FakeMessageRepo::default()
        };
        let (registry, _hub, relay) = relay_fixture(repo);
        let mut bob = connect(&registry, &relay.hub, &u("bob"));
        registry.join_conversation(bob.conn, &u("bob"), Some(&u("alice")));
        registry.join_conversation(bob.conn, &u("bob"), None);

        let err = relay
            .send_message(&u("alice"), &u("bob"), "hello")
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Store(_)));
        assert!(bob.drain().is_empty());
    }

    #[tokio::test]
    async fn typing_reaches_solo_and_conversation_channels() {
        let (registry, _hub, relay) = relay_fixture(FakeMessageRepo::default());
        let mut bob = connect(&registry, &relay.hub, &u("bob"));
        registry.join_conversation(bob.conn, &u("bob"), None);

        relay.relay_typing(&u("alice"), &u("bob"), true);
        relay.relay_typing(&u("alice"), &u("bob"), false);

        let events = bob.drain();
        assert!(matches!(events[0], ServerEvent::Typing { .. }));
        assert!(matches!(events[1], ServerEvent::StopTyping { .. }));
        // Nothing was persisted for typing.
        assert!(relay.messages.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sent_messages_surface_in_chat_summaries() {
        use crate::summary::aggregator::fold_summaries;

        let (_registry, _hub, relay) = relay_fixture(FakeMessageRepo::default());
        relay
            .send_message(&u("alice"), &u("bob"), "hi")
            .await
            .unwrap();

        // Alice's view: one entry for bob, nothing unread (she is the sender).
        let rows = relay.messages.rows.lock().unwrap().clone();
        let summaries = fold_summaries(&u("alice"), rows);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].partner, u("bob"));
        assert_eq!(summaries[0].last_message.content, "hi");
        assert_eq!(summaries[0].unread_count, 0);

        // Bob's view: the same message counts as unread, until he marks it.
        let rows = relay.messages.rows.lock().unwrap().clone();
        assert_eq!(fold_summaries(&u("bob"), rows)[0].unread_count, 1);

        relay.mark_read(&u("bob"), &u("alice")).await.unwrap();
        let rows = relay.messages.rows.lock().unwrap().clone();
        assert_eq!(fold_summaries(&u("bob"), rows)[0].unread_count, 0);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent_and_notifies() {
        let (registry, _hub, relay) = relay_fixture(FakeMessageRepo::default());
        relay
            .send_message(&u("bob"), &u("alice"), "one")
            .await
            .unwrap();
        relay
            .send_message(&u("bob"), &u("alice"), "two")
            .await
            .unwrap();

        let mut alice = connect(&registry, &relay.hub, &u("alice"));
        registry.join_conversation(alice.conn, &u("alice"), None);

        assert_eq!(relay.mark_read(&u("alice"), &u("bob")).await.unwrap(), 2);
        assert_eq!(relay.mark_read(&u("alice"), &u("bob")).await.unwrap(), 0);

        // Both calls succeeded and both nudged the chat list.
        let refreshes = alice
            .drain()
            .iter()
            .filter(|e| matches!(e, ServerEvent::RefreshChatList))
            .count();
        assert_eq!(refreshes, 2);
    }
}
