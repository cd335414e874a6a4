//! WebSocket handler for Axum
//!
//! Handles connection handshakes, event routing, and disconnect cleanup.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use stayline_shared::{AgentProfile, Sender};

use crate::chat;
use crate::state::AppState;

use super::{
    connection::{Connection, Role},
    events::{ClientEvent, ServerEvent},
    room::Topic,
    state::WebSocketState,
};

/// Handshake metadata supplied as query parameters on the upgrade request
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    role: String,
    session_id: Option<Uuid>,
    admin_id: Option<Uuid>,
    /// Display name for typing indicators (admin connections)
    name: Option<String>,
    avatar: Option<String>,
}

/// WebSocket handler - upgrades HTTP connection to WebSocket.
/// Role and scope are declared out of band via query parameters:
/// visitors bind to one session, admins to their agent identity.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
    Query(params): Query<ConnectQuery>,
) -> Result<Response, StatusCode> {
    let identity = match params.role.as_str() {
        "admin" => {
            let agent_id = params.admin_id.ok_or(StatusCode::BAD_REQUEST)?;
            let profile = AgentProfile {
                name: params.name.unwrap_or_else(|| "Support".to_string()),
                avatar: params.avatar,
            };
            ConnectIdentity::Admin { agent_id, profile }
        }
        "visitor" => {
            let session_id = params.session_id.ok_or(StatusCode::BAD_REQUEST)?;
            match chat::store::session_exists(&app_state.pool, session_id).await {
                Ok(true) => ConnectIdentity::Visitor { session_id },
                Ok(false) => return Err(StatusCode::NOT_FOUND),
                Err(e) => {
                    tracing::error!(error = ?e, "WebSocket handshake: session lookup failed");
                    return Err(StatusCode::INTERNAL_SERVER_ERROR);
                }
            }
        }
        _ => return Err(StatusCode::BAD_REQUEST),
    };

    tracing::info!(role = %params.role, "WebSocket connection upgrade requested");

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, identity, app_state)))
}

#[derive(Debug)]
enum ConnectIdentity {
    Visitor { session_id: Uuid },
    Admin { agent_id: Uuid, profile: AgentProfile },
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, identity: ConnectIdentity, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();

    // Channel for sending events to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let conn = match &identity {
        ConnectIdentity::Visitor { .. } => Connection::new(Role::Visitor, None, None, tx),
        ConnectIdentity::Admin { agent_id, profile } => {
            Connection::new(Role::Admin, Some(*agent_id), Some(profile.clone()), tx)
        }
    };

    let ws_state = app_state.ws.clone();
    let conn = ws_state.add_connection(conn).await;
    let connection_id = conn.id;

    // Send connection acknowledgment
    let _ = conn.send(ServerEvent::Connected { connection_id });

    // Initial room membership
    match &identity {
        ConnectIdentity::Visitor { session_id } => {
            let topic = Topic::Session(*session_id);
            conn.subscribe(topic).await;
            ws_state.rooms.join(topic, Arc::clone(&conn)).await;
        }
        ConnectIdentity::Admin { agent_id, .. } => {
            conn.subscribe(Topic::Agents).await;
            ws_state.rooms.join(Topic::Agents, Arc::clone(&conn)).await;
            ws_state.presence.register_agent(*agent_id).await;
        }
    }

    // Spawn task to send messages to client
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sink.send(Message::Text(json)).await.is_err() {
                        break; // Connection closed
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Failed to serialize WebSocket event");
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = stream.next().await {
        if let Ok(msg) = msg {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        handle_client_event(event, Arc::clone(&conn), app_state.clone()).await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = ?e,
                            message = %text,
                            "Failed to parse client event"
                        );
                        let _ = conn.send(ServerEvent::Error {
                            message: "Invalid event format".to_string(),
                        });
                    }
                },
                Message::Close(_) => {
                    tracing::info!(connection_id = %connection_id, "WebSocket close frame received");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // Axum handles ping/pong automatically
                }
                _ => {} // Ignore binary messages
            }
        }
    }

    // Cleanup on disconnect
    tracing::info!(connection_id = %connection_id, "WebSocket connection closing");
    ws_state.remove_connection(&connection_id).await;

    if let ConnectIdentity::Admin { agent_id, profile } = identity {
        disconnect_admin(&ws_state, agent_id, &profile).await;
    }
    // Visitor disconnects need no cleanup: the session persists
    // independently of connection state.

    send_task.abort();
}

/// Admin disconnect: drop presence, synthesize typing-off for any session
/// the agent had marked typing (so no indicator sticks), and tell the rooms
/// the agent was viewing that the viewer list changed.
async fn disconnect_admin(ws_state: &WebSocketState, agent_id: Uuid, profile: &AgentProfile) {
    let viewed = ws_state.presence.sessions_of(agent_id).await;
    ws_state.presence.drop_agent(agent_id).await;

    for session_id in ws_state.typing.drop_agent(agent_id).await {
        ws_state
            .rooms
            .broadcast(
                &Topic::Session(session_id),
                ServerEvent::Typing {
                    session_id,
                    sender: Sender::Admin,
                    is_typing: false,
                    agent_id: Some(agent_id),
                    agent: Some(profile.clone()),
                },
            )
            .await;
    }

    for session_id in viewed {
        broadcast_viewers(ws_state, session_id).await;
    }
}

/// Broadcast the current viewer list of a session to its room
async fn broadcast_viewers(ws_state: &WebSocketState, session_id: Uuid) {
    let viewers = ws_state.presence.viewers_of(session_id).await;
    ws_state
        .rooms
        .broadcast(
            &Topic::Session(session_id),
            ServerEvent::ViewersUpdate { session_id, viewers },
        )
        .await;
}

/// Handle client event
async fn handle_client_event(event: ClientEvent, conn: Arc<Connection>, app_state: AppState) {
    use ClientEvent::*;

    let ws_state = app_state.ws.clone();

    match event {
        JoinSession { session_id } => {
            let topic = Topic::Session(session_id);
            conn.subscribe(topic).await;
            ws_state.rooms.join(topic, Arc::clone(&conn)).await;

            if let Some(agent_id) = conn.agent_id {
                ws_state.presence.join_session(agent_id, session_id).await;
                broadcast_viewers(&ws_state, session_id).await;
            }
        }

        LeaveSession { session_id } => {
            let topic = Topic::Session(session_id);
            conn.unsubscribe(&topic).await;
            ws_state.rooms.leave(&topic, &conn.id).await;

            if let Some(agent_id) = conn.agent_id {
                ws_state.presence.leave_session(agent_id, session_id).await;

                // Leaving the room also ends any typing indicator there
                if ws_state.typing.clear(session_id, agent_id).await {
                    ws_state
                        .rooms
                        .broadcast(
                            &Topic::Session(session_id),
                            ServerEvent::Typing {
                                session_id,
                                sender: Sender::Admin,
                                is_typing: false,
                                agent_id: Some(agent_id),
                                agent: conn.profile.clone(),
                            },
                        )
                        .await;
                }

                broadcast_viewers(&ws_state, session_id).await;
            }
        }

        Message {
            session_id,
            id,
            text,
            attachments,
        } => {
            // The sender tag comes from the connection's role, never the payload
            let sender = conn.role.as_sender();
            if let Err(e) =
                chat::post_message(&app_state, session_id, id, sender, text, attachments).await
            {
                // The reference design dropped these silently; answering the
                // sender lets clients reconcile a failed optimistic message.
                let _ = conn.send(ServerEvent::Error {
                    message: e.to_string(),
                });
            }
        }

        Typing {
            session_id,
            is_typing,
        } => {
            match (conn.role, conn.agent_id) {
                (Role::Admin, Some(agent_id)) => {
                    let profile = conn.profile.clone().unwrap_or(AgentProfile {
                        name: "Support".to_string(),
                        avatar: None,
                    });
                    if is_typing {
                        ws_state.typing.set(session_id, agent_id, profile.clone()).await;
                    } else if !ws_state.typing.clear(session_id, agent_id).await {
                        // No active indicator; nothing to relay
                        return;
                    }
                    ws_state
                        .rooms
                        .broadcast(
                            &Topic::Session(session_id),
                            ServerEvent::Typing {
                                session_id,
                                sender: Sender::Admin,
                                is_typing,
                                agent_id: Some(agent_id),
                                agent: Some(profile),
                            },
                        )
                        .await;
                }
                _ => {
                    // Visitor typing is relay-only, never tracked server-side
                    ws_state
                        .rooms
                        .broadcast(
                            &Topic::Session(session_id),
                            ServerEvent::Typing {
                                session_id,
                                sender: Sender::Visitor,
                                is_typing,
                                agent_id: None,
                                agent: None,
                            },
                        )
                        .await;
                }
            }
        }

        Ping => {
            let _ = conn.send(ServerEvent::Pong);
        }
    }
}
