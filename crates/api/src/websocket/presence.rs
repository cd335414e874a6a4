//! Agent presence registry
//!
//! Process-local map of connected support agents to the sessions they are
//! actively viewing. Presence is advisory: it drives auto-assignment and the
//! "who's viewing" indicator, never message delivery, so a restart clearing
//! it is acceptable.
//!
//! Mutated only from gateway connection-lifecycle callbacks (connect, join,
//! leave, disconnect); everything else reads snapshots.

use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Registry of connected agents and their joined session rooms
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    agents: RwLock<HashMap<Uuid, HashSet<Uuid>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure an entry exists for an agent (first realtime connection)
    pub async fn register_agent(&self, agent_id: Uuid) {
        let mut agents = self.agents.write().await;
        agents.entry(agent_id).or_default();
        tracing::debug!(agent_id = %agent_id, total_agents = agents.len(), "Agent registered");
    }

    /// Record that an agent joined a session room
    pub async fn join_session(&self, agent_id: Uuid, session_id: Uuid) {
        let mut agents = self.agents.write().await;
        agents.entry(agent_id).or_default().insert(session_id);
    }

    /// Record that an agent left a session room
    pub async fn leave_session(&self, agent_id: Uuid, session_id: Uuid) {
        let mut agents = self.agents.write().await;
        if let Some(sessions) = agents.get_mut(&agent_id) {
            sessions.remove(&session_id);
        }
    }

    /// Snapshot of `(agent_id, active session count)` for auto-assignment.
    /// Sorted by agent id so equal loads resolve deterministically.
    pub async fn agents_with_load(&self) -> Vec<(Uuid, usize)> {
        let agents = self.agents.read().await;
        let mut load: Vec<(Uuid, usize)> =
            agents.iter().map(|(id, s)| (*id, s.len())).collect();
        load.sort_by_key(|(id, _)| *id);
        load
    }

    /// Agents currently viewing a session, for the viewer-list broadcast.
    /// Sorted for stable client rendering.
    pub async fn viewers_of(&self, session_id: Uuid) -> Vec<Uuid> {
        let agents = self.agents.read().await;
        let mut viewers: Vec<Uuid> = agents
            .iter()
            .filter(|(_, sessions)| sessions.contains(&session_id))
            .map(|(id, _)| *id)
            .collect();
        viewers.sort();
        viewers
    }

    /// Sessions an agent currently views (read before dropping the agent so
    /// their rooms can be told the viewer list changed)
    pub async fn sessions_of(&self, agent_id: Uuid) -> Vec<Uuid> {
        let agents = self.agents.read().await;
        agents
            .get(&agent_id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Remove an agent entirely (connection dropped). Reconnect
    /// re-establishes presence from scratch.
    pub async fn drop_agent(&self, agent_id: Uuid) {
        let mut agents = self.agents.write().await;
        if agents.remove(&agent_id).is_some() {
            tracing::debug!(agent_id = %agent_id, remaining_agents = agents.len(), "Agent dropped");
        }
    }

    /// Number of connected agents
    pub async fn agent_count(&self) -> usize {
        let agents = self.agents.read().await;
        agents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_join_leave() {
        let presence = PresenceRegistry::new();
        let agent = Uuid::new_v4();
        let session = Uuid::new_v4();

        presence.register_agent(agent).await;
        assert_eq!(presence.agents_with_load().await, vec![(agent, 0)]);

        presence.join_session(agent, session).await;
        assert_eq!(presence.agents_with_load().await, vec![(agent, 1)]);
        assert_eq!(presence.viewers_of(session).await, vec![agent]);

        presence.leave_session(agent, session).await;
        assert_eq!(presence.agents_with_load().await, vec![(agent, 0)]);
        assert!(presence.viewers_of(session).await.is_empty());
    }

    #[tokio::test]
    async fn test_drop_agent_clears_entry() {
        let presence = PresenceRegistry::new();
        let agent = Uuid::new_v4();

        presence.register_agent(agent).await;
        presence.join_session(agent, Uuid::new_v4()).await;
        presence.join_session(agent, Uuid::new_v4()).await;
        assert_eq!(presence.agent_count().await, 1);

        presence.drop_agent(agent).await;
        assert_eq!(presence.agent_count().await, 0);
        assert!(presence.agents_with_load().await.is_empty());
    }

    #[tokio::test]
    async fn test_join_without_register_creates_entry() {
        let presence = PresenceRegistry::new();
        let agent = Uuid::new_v4();
        let session = Uuid::new_v4();

        presence.join_session(agent, session).await;
        assert_eq!(presence.agents_with_load().await, vec![(agent, 1)]);
    }

    #[tokio::test]
    async fn test_load_snapshot_counts_sessions() {
        let presence = PresenceRegistry::new();
        let busy = Uuid::new_v4();
        let idle = Uuid::new_v4();

        presence.register_agent(idle).await;
        for _ in 0..3 {
            presence.join_session(busy, Uuid::new_v4()).await;
        }

        let load: HashMap<Uuid, usize> = presence.agents_with_load().await.into_iter().collect();
        assert_eq!(load[&busy], 3);
        assert_eq!(load[&idle], 0);
    }
}
