//! Broadcast hub delivering server events to channel subscribers.
//!
//! Fan-out is explicit message passing: given a channel key and a payload,
//! deliver to every currently-registered member's outbox. The hub never
//! knows about the transport -- each connection's gateway task drains its
//! own mpsc receiver and writes frames to the socket.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use parley_types::channel::ChannelKey;
use parley_types::event::ServerEvent;
use parley_types::id::ConnectionId;

use crate::session::SessionRegistry;

/// Delivery sink for one connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Fans events out to connections by channel membership.
///
/// Sinks are attached on socket accept and detached on disconnect, paired
/// with registry register/unregister. A send to a sink whose receiver is
/// gone fails silently; the disconnect path reaps the entry.
pub struct BroadcastHub {
    registry: Arc<SessionRegistry>,
    sinks: DashMap<ConnectionId, EventSender>,
}

impl BroadcastHub {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            sinks: DashMap::new(),
        }
    }

    pub fn attach(&self, connection: ConnectionId, sender: EventSender) {
        self.sinks.insert(connection, sender);
    }

    pub fn detach(&self, connection: ConnectionId) {
        self.sinks.remove(&connection);
    }

    /// Deliver to a single connection. False when it has no live sink.
    pub fn to_connection(&self, connection: ConnectionId, event: ServerEvent) -> bool {
        match self.sinks.get(&connection) {
            Some(sink) => sink.send(event).is_ok(),
            None => false,
        }
    }

    /// Deliver to every current member of a channel.
    ///
    /// Broadcasting to nobody is normal (the partner is offline). Returns
    /// the number of successful deliveries; one dead sink never aborts
    /// fan-out to the rest.
    pub fn to_channel(&self, key: &ChannelKey, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        for connection in self.registry.members_of(key) {
            if self.to_connection(connection, event.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Deliver to every live connection, joined or not (presence updates).
    pub fn to_all(&self, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        for sink in self.sinks.iter() {
            if sink.value().send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::id::UserId;

    fn u(s: &str) -> UserId {
        UserId::from(s)
    }

    fn wired_connection(
        registry: &SessionRegistry,
        hub: &BroadcastHub,
        user: &UserId,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(conn);
        registry.identify(conn, user);
        hub.attach(conn, tx);
        (conn, rx)
    }

    #[tokio::test]
    async fn to_channel_reaches_only_members() {
        let registry = Arc::new(SessionRegistry::new());
        let hub = BroadcastHub::new(registry.clone());

        let (c1, mut rx1) = wired_connection(&registry, &hub, &u("u1"));
        let (_c2, mut rx2) = wired_connection(&registry, &hub, &u("u2"));
        registry.join_conversation(c1, &u("u1"), None);

        let delivered = hub.to_channel(&ChannelKey::solo(&u("u1")), &ServerEvent::RefreshChatList);

        assert_eq!(delivered, 1);
        assert_eq!(rx1.try_recv().unwrap(), ServerEvent::RefreshChatList);
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn to_channel_with_no_members_delivers_nothing() {
        let registry = Arc::new(SessionRegistry::new());
        let hub = BroadcastHub::new(registry.clone());

        let delivered = hub.to_channel(&ChannelKey::solo(&u("ghost")), &ServerEvent::RefreshChatList);
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn dead_sink_does_not_abort_fanout() {
        let registry = Arc::new(SessionRegistry::new());
        let hub = BroadcastHub::new(registry.clone());

        let (c1, rx1) = wired_connection(&registry, &hub, &u("u1"));
        let (c2, mut rx2) = wired_connection(&registry, &hub, &u("u2"));
        registry.join_conversation(c1, &u("u1"), Some(&u("u2")));
        registry.join_conversation(c2, &u("u2"), Some(&u("u1")));
        drop(rx1); // u1's receiver went away without a clean disconnect

        let key = ChannelKey::conversation(&u("u1"), &u("u2"));
        let delivered = hub.to_channel(&key, &ServerEvent::RefreshChatList);

        assert_eq!(delivered, 1);
        assert_eq!(rx2.try_recv().unwrap(), ServerEvent::RefreshChatList);
    }

    #[tokio::test]
    async fn to_all_reaches_unjoined_connections() {
        let registry = Arc::new(SessionRegistry::new());
        let hub = BroadcastHub::new(registry.clone());

        let (_c1, mut rx1) = wired_connection(&registry, &hub, &u("u1"));
        let (_c2, mut rx2) = wired_connection(&registry, &hub, &u("u2"));

        let delivered = hub.to_all(&ServerEvent::Pong);

        assert_eq!(delivered, 2);
        assert_eq!(rx1.try_recv().unwrap(), ServerEvent::Pong);
        assert_eq!(rx2.try_recv().unwrap(), ServerEvent::Pong);
    }

    #[tokio::test]
    async fn detach_stops_delivery() {
        let registry = Arc::new(SessionRegistry::new());
        let hub = BroadcastHub::new(registry.clone());

        let (c1, mut rx1) = wired_connection(&registry, &hub, &u("u1"));
        hub.detach(c1);

        assert!(!hub.to_connection(c1, ServerEvent::Pong));
        assert!(rx1.try_recv().is_err());
    }
}
