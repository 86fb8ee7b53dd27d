//! WebSocket gateway binding sockets to the relay.
//!
//! The `/ws` endpoint upgrades an HTTP connection to a WebSocket. Once
//! connected, the handler:
//!
//! - **Forwards events:** drains the connection's outbox (fed by the
//!   [`BroadcastHub`]) and pushes every [`ServerEvent`] to the client as a
//!   JSON text frame.
//! - **Receives commands:** parses incoming text frames as
//!   [`ClientCommand`] and dispatches to the registry, relay, and presence
//!   service. Malformed frames are logged and ignored.
//!
//! One select loop per connection keeps a single connection's events
//! serialized relative to each other while connections run in parallel.
//! Disconnect tears the connection out of the hub and registry first (both
//! synchronous) and only then re-evaluates presence, so cleanup completes
//! even when a broadcast on the way out fails.
//!
//! [`BroadcastHub`]: parley_core::hub::BroadcastHub

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use parley_types::event::{ClientCommand, ServerEvent};
use parley_types::id::ConnectionId;

use crate::state::AppState;

/// Upgrade an HTTP request to a WebSocket connection.
///
/// This is mounted at `/ws` in the router.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Core WebSocket connection handler.
async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let connection = ConnectionId::new();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut outbox) = mpsc::unbounded_channel::<ServerEvent>();

    state.registry.register(connection);
    state.hub.attach(connection, tx);
    tracing::debug!(connection = %connection, "socket connected");

    loop {
        tokio::select! {
            // --- Branch 1: Forward hub events to the WebSocket client ---
            event = outbox.recv() => {
                match event {
                    Some(event) => {
                        match serde_json::to_string(&event) {
                            Ok(json) => {
                                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                                    // Client disconnected
                                    break;
                                }
                            }
                            Err(err) => {
                                tracing::warn!("Failed to serialize ServerEvent: {err}");
                            }
                        }
                    }
                    // Sink detached (server shutting this connection down)
                    None => break,
                }
            }

            // --- Branch 2: Process commands from the WebSocket client ---
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        process_command(&text, connection, &state).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        // Client disconnected
                        break;
                    }
                    Some(Err(err)) => {
                        tracing::debug!("WebSocket receive error: {err}");
                        break;
                    }
                    // Ignore binary, ping, pong protocol frames (handled by axum/tungstenite)
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    disconnect(connection, &state).await;
}

/// Parse and dispatch a single command from the WebSocket client.
async fn process_command(text: &str, connection: ConnectionId, state: &AppState) {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(err) => {
            tracing::warn!(
                raw = %text,
                error = %err,
                "Ignoring malformed WebSocket command"
            );
            return;
        }
    };

    match command {
        ClientCommand::Identify { user_id } => {
            state.registry.identify(connection, &user_id);
            // Joining the solo channel eagerly means chat-list refreshes
            // reach this connection even before any joinRoom arrives.
            state.registry.join_conversation(connection, &user_id, None);
            tracing::debug!(connection = %connection, user = %user_id, "connection identified");
        }

        ClientCommand::JoinRoom {
            user_id,
            selected_user_id,
        } => {
            state
                .registry
                .join_conversation(connection, &user_id, selected_user_id.as_ref());
        }

        ClientCommand::SendMessage {
            sender,
            receiver,
            content,
        } => {
            if let Err(err) = state.relay.send_message(&sender, &receiver, &content).await {
                tracing::warn!(connection = %connection, error = %err, "sendMessage failed");
                // Only the issuing connection hears about the failure.
                state.hub.to_connection(
                    connection,
                    ServerEvent::ErrorMessage {
                        message: err.to_string(),
                    },
                );
            }
        }

        ClientCommand::Typing {
            sender_id,
            receiver_id,
        } => {
            state.relay.relay_typing(&sender_id, &receiver_id, true);
        }

        ClientCommand::StopTyping {
            sender_id,
            receiver_id,
        } => {
            state.relay.relay_typing(&sender_id, &receiver_id, false);
        }

        ClientCommand::UserOnline { user_id } => {
            state.presence.mark_online(&user_id).await;
        }

        ClientCommand::MarkMessagesAsRead {
            user_id,
            selected_user_id,
        } => {
            if let Err(err) = state.relay.mark_read(&user_id, &selected_user_id).await {
                // Reported, but never kills the connection.
                tracing::warn!(connection = %connection, error = %err, "markMessagesAsRead failed");
                state.hub.to_connection(
                    connection,
                    ServerEvent::ErrorMessage {
                        message: err.to_string(),
                    },
                );
            }
        }

        ClientCommand::Ping => {
            state.hub.to_connection(connection, ServerEvent::Pong);
            if let Some(user) = state.registry.bound_user(connection) {
                state.presence.heartbeat(&user).await;
            }
        }
    }
}

/// Remove every trace of the connection, then re-evaluate presence.
async fn disconnect(connection: ConnectionId, state: &AppState) {
    state.hub.detach(connection);
    if let Some(user) = state.registry.unregister(connection) {
        let remaining = state.registry.live_connection_count(&user);
        state.presence.handle_disconnect(&user, remaining).await;
    }
    tracing::debug!(connection = %connection, "socket disconnected");
}
