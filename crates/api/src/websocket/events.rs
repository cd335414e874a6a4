//! WebSocket event types and serialization
//!
//! Defines all client-to-server and server-to-client event types
//! with type-safe serde serialization.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stayline_shared::{AgentProfile, Attachment, ChatMessage, Sender, SessionSummary};

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// Events sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join a session room
    JoinSession { session_id: Uuid },

    /// Leave a session room
    LeaveSession { session_id: Uuid },

    /// Submit a message to a session. The sender tag is derived from the
    /// connection's role, not trusted from the payload; `id` is the
    /// client-assigned message id for optimistic rendering.
    Message {
        session_id: Uuid,
        #[serde(default)]
        id: Option<Uuid>,
        #[serde(default)]
        text: String,
        #[serde(default)]
        attachments: Vec<Attachment>,
    },

    /// Report typing state in a session
    Typing { session_id: Uuid, is_typing: bool },

    /// Heartbeat ping to keep connection alive
    Ping,
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Connection acknowledged
    Connected { connection_id: Uuid },

    /// New message persisted to a session
    NewMessage {
        session_id: Uuid,
        message: ChatMessage,
    },

    /// Session summary changed (new message, assignment); broadcast to the
    /// agents room for list refresh
    SessionUpdated { session: SessionSummary },

    /// Typing state relayed to a session room, tagged with the sender so
    /// the other side can render the indicator
    Typing {
        session_id: Uuid,
        sender: Sender,
        is_typing: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent_id: Option<Uuid>,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent: Option<AgentProfile>,
    },

    /// Agents currently viewing a session changed
    ViewersUpdate {
        session_id: Uuid,
        viewers: Vec<Uuid>,
    },

    /// Heartbeat response
    Pong,

    /// Error message
    Error { message: String },
}
