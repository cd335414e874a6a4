//! Topic room management for pub/sub
//!
//! Fan-out is keyed by [`Topic`] rather than a raw session id so the session
//! rooms and the agents broadcast group share one mechanism, independent of
//! the transport.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;
use super::events::ServerEvent;

/// Fan-out key: a single session's room, or the broadcast group every
/// connected admin joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Session(Uuid),
    Agents,
}

/// Manages topic rooms for broadcasting events
pub struct RoomManager {
    /// Map of topic -> list of connections
    rooms: Arc<RwLock<HashMap<Topic, Vec<Arc<Connection>>>>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a connection to a topic room
    pub async fn join(&self, topic: Topic, conn: Arc<Connection>) {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(topic).or_insert_with(Vec::new);
        // A connection holds at most one membership per topic
        if !room.iter().any(|c| c.id == conn.id) {
            room.push(Arc::clone(&conn));
        }

        tracing::debug!(
            topic = ?topic,
            connection_id = %conn.id,
            room_size = room.len(),
            "Connection joined room"
        );
    }

    /// Remove a connection from a topic room
    pub async fn leave(&self, topic: &Topic, connection_id: &Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(conns) = rooms.get_mut(topic) {
            conns.retain(|c| c.id != *connection_id);

            // Clean up empty rooms
            if conns.is_empty() {
                rooms.remove(topic);
                tracing::debug!(topic = ?topic, "Removed empty room");
            } else {
                tracing::debug!(
                    topic = ?topic,
                    connection_id = %connection_id,
                    room_size = conns.len(),
                    "Connection left room"
                );
            }
        }
    }

    /// Broadcast an event to all connections in a topic room
    ///
    /// Silently ignores send errors (closed connections will be cleaned up)
    pub async fn broadcast(&self, topic: &Topic, event: ServerEvent) {
        let rooms = self.rooms.read().await;
        if let Some(conns) = rooms.get(topic) {
            let mut failed_count = 0;

            for conn in conns {
                if conn.send(event.clone()).is_err() {
                    failed_count += 1;
                    tracing::warn!(
                        connection_id = %conn.id,
                        "Failed to send event to connection (likely closed)"
                    );
                }
            }

            tracing::debug!(
                topic = ?topic,
                recipients = conns.len() - failed_count,
                failed = failed_count,
                "Broadcast event to room"
            );
        }
    }

    /// Remove a connection from all rooms
    pub async fn remove_connection(&self, connection_id: &Uuid) {
        let mut rooms = self.rooms.write().await;
        for conns in rooms.values_mut() {
            conns.retain(|c| c.id != *connection_id);
        }
        rooms.retain(|_, conns| !conns.is_empty());
    }

    /// Get room size (number of connections) for a topic
    pub async fn room_size(&self, topic: &Topic) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(topic).map(|v| v.len()).unwrap_or(0)
    }

    /// Get total number of active rooms
    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}
