//! Session assignment state machine
//!
//! `open -> assigned` on request; `assigned -> assigned` only with `force`
//! (or as an idempotent no-op when the target is the current agent). There
//! is no terminal state: sessions are reaped by TTL, not closed.

use sqlx::PgPool;
use uuid::Uuid;

use stayline_shared::ChatSession;

use crate::error::{ApiError, ApiResult};
use crate::websocket::presence::PresenceRegistry;

use super::store;

/// Pick the present agent with the fewest active session rooms. The
/// snapshot arrives sorted by agent id, so equal loads resolve to the
/// lowest id and selection is deterministic.
pub fn pick_least_loaded(load: &[(Uuid, usize)]) -> Option<Uuid> {
    load.iter()
        .min_by_key(|(id, count)| (*count, *id))
        .map(|(id, _)| *id)
}

/// Assign a session to an explicit agent, or auto-pick the least-loaded
/// present one. Enforces the state machine and extends the session's life
/// on every successful transition. The flag reports whether a transition
/// actually happened (false for the idempotent same-agent no-op), so
/// callers broadcast only real changes.
pub async fn assign(
    pool: &PgPool,
    presence: &PresenceRegistry,
    session_id: Uuid,
    explicit_agent: Option<Uuid>,
    force: bool,
) -> ApiResult<(ChatSession, bool)> {
    let session = store::get_session(pool, session_id).await?;

    let target = match explicit_agent {
        Some(agent_id) => agent_id,
        None => {
            let load = presence.agents_with_load().await;
            pick_least_loaded(&load).ok_or(ApiError::NoAgentAvailable)?
        }
    };

    if let Some(current) = session.assigned_agent_id {
        // Re-assigning the current agent is a no-op success
        if current == target {
            return Ok((session, false));
        }
        // A different agent may only take over explicitly
        if !force {
            return Err(ApiError::Conflict(format!(
                "Session is already assigned to agent {}",
                current
            )));
        }
    }

    let updated = store::set_assignment(pool, session_id, target).await?;

    tracing::info!(
        session_id = %session_id,
        agent_id = %target,
        forced = force,
        auto_picked = explicit_agent.is_none(),
        "Chat session assigned"
    );

    Ok((updated, true))
}
