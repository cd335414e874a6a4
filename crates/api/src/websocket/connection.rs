//! WebSocket connection management
//!
//! Represents an active WebSocket connection with room-membership tracking.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use stayline_shared::{AgentProfile, Sender};

use super::events::ServerEvent;
use super::room::Topic;

/// Role a connection declared at handshake time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Visitor,
    Admin,
}

impl Role {
    /// Messages submitted over this connection carry this sender tag.
    pub fn as_sender(&self) -> Sender {
        match self {
            Role::Visitor => Sender::Visitor,
            Role::Admin => Sender::Admin,
        }
    }
}

/// Represents an active WebSocket connection
#[derive(Debug)]
pub struct Connection {
    /// Unique ID for this physical connection
    pub id: Uuid,

    /// Role declared at handshake
    pub role: Role,

    /// Agent identity, present on admin connections only
    pub agent_id: Option<Uuid>,

    /// Lightweight agent profile for typing indicators (admin connections)
    pub profile: Option<AgentProfile>,

    /// Channel to send events to this connection
    pub sender: mpsc::UnboundedSender<ServerEvent>,

    /// Set of topics this connection is subscribed to
    pub subscriptions: Arc<RwLock<HashSet<Topic>>>,
}

impl Connection {
    pub fn new(
        role: Role,
        agent_id: Option<Uuid>,
        profile: Option<AgentProfile>,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            agent_id,
            profile,
            sender,
            subscriptions: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Send an event to this connection
    ///
    /// Returns Ok(()) if sent successfully, Err if connection is closed
    #[allow(clippy::result_large_err)] // Error type is from tokio mpsc, containing the failed event
    pub fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event)
    }

    /// Subscribe to a topic
    pub async fn subscribe(&self, topic: Topic) {
        let mut subs = self.subscriptions.write().await;
        subs.insert(topic);
    }

    /// Unsubscribe from a topic
    pub async fn unsubscribe(&self, topic: &Topic) {
        let mut subs = self.subscriptions.write().await;
        subs.remove(topic);
    }

    /// Check if subscribed to a topic
    pub async fn is_subscribed(&self, topic: &Topic) -> bool {
        let subs = self.subscriptions.read().await;
        subs.contains(topic)
    }
}
