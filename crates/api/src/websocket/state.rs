//! Gateway state management
//!
//! Maintains the state shared by all WebSocket connections: the connection
//! table, topic rooms, the presence registry, and the typing table. All four
//! are owned here and injected into handlers, so tests can instantiate
//! isolated gateways.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;
use super::presence::PresenceRegistry;
use super::room::RoomManager;
use super::typing::TypingTable;

/// Gateway state shared across all connections
#[derive(Clone)]
pub struct WebSocketState {
    /// All active connections indexed by connection id
    pub connections: Arc<RwLock<HashMap<Uuid, Arc<Connection>>>>,

    /// Room manager for topic subscriptions
    pub rooms: Arc<RoomManager>,

    /// Connected-agent presence
    pub presence: Arc<PresenceRegistry>,

    /// Ephemeral typing indicators
    pub typing: Arc<TypingTable>,
}

impl WebSocketState {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            rooms: Arc::new(RoomManager::new()),
            presence: Arc::new(PresenceRegistry::new()),
            typing: Arc::new(TypingTable::new()),
        }
    }

    /// Add a connection
    pub async fn add_connection(&self, conn: Connection) -> Arc<Connection> {
        let conn = Arc::new(conn);
        let mut connections = self.connections.write().await;
        connections.insert(conn.id, Arc::clone(&conn));

        tracing::info!(
            connection_id = %conn.id,
            role = ?conn.role,
            total_connections = connections.len(),
            "WebSocket connection added"
        );

        conn
    }

    /// Remove a connection and its room memberships
    pub async fn remove_connection(&self, connection_id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(connection_id).is_some() {
            self.rooms.remove_connection(connection_id).await;

            tracing::info!(
                connection_id = %connection_id,
                remaining_connections = connections.len(),
                "WebSocket connection removed"
            );
        }
    }

    /// Get total number of active connections
    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }
}

impl Default for WebSocketState {
    fn default() -> Self {
        Self::new()
    }
}
