//! Ephemeral typing state
//!
//! Per-session map of agents whose clients currently report typing, with the
//! profile to render next to the indicator. Never persisted. Visitor typing
//! is relayed but not tracked; only agent entries need server-side cleanup
//! so a dropped connection cannot leave a stuck indicator.

use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use stayline_shared::AgentProfile;

/// Tracks which agents are typing in which sessions
#[derive(Debug, Default)]
pub struct TypingTable {
    sessions: RwLock<HashMap<Uuid, HashMap<Uuid, AgentProfile>>>,
}

impl TypingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an agent as typing in a session
    pub async fn set(&self, session_id: Uuid, agent_id: Uuid, profile: AgentProfile) {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id).or_default().insert(agent_id, profile);
    }

    /// Clear an agent's typing state in a session. Returns whether an
    /// indicator was actually active, so callers only broadcast real
    /// transitions.
    pub async fn clear(&self, session_id: Uuid, agent_id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        if let Some(agents) = sessions.get_mut(&session_id) {
            let was_typing = agents.remove(&agent_id).is_some();
            if agents.is_empty() {
                sessions.remove(&session_id);
            }
            was_typing
        } else {
            false
        }
    }

    /// Agents currently typing in a session
    pub async fn typing_in(&self, session_id: Uuid) -> Vec<(Uuid, AgentProfile)> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session_id)
            .map(|agents| agents.iter().map(|(id, p)| (*id, p.clone())).collect())
            .unwrap_or_default()
    }

    /// Remove an agent from every session, returning the sessions that had
    /// an entry so the gateway can synthesize `is_typing: false` for each.
    pub async fn drop_agent(&self, agent_id: Uuid) -> Vec<Uuid> {
        let mut sessions = self.sessions.write().await;
        let mut affected = Vec::new();
        for (session_id, agents) in sessions.iter_mut() {
            if agents.remove(&agent_id).is_some() {
                affected.push(*session_id);
            }
        }
        sessions.retain(|_, agents| !agents.is_empty());
        affected
    }
}
