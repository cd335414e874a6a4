//! Chat core: session store, lifecycle control, attachment intake
//!
//! The socket path and the plain request path funnel through
//! [`post_message`] so both get identical persistence and broadcast
//! semantics.

pub mod assignment;
pub mod attachments;
pub mod store;

use uuid::Uuid;

use stayline_shared::{preview, Attachment, ChatMessage, ChatSession, Sender, SessionSummary};

use crate::error::ApiResult;
use crate::state::AppState;
use crate::websocket::{events::ServerEvent, Topic};

/// Persist a message and fan it out: every connection in the session's room
/// receives the message, and the agents room receives a refreshed summary
/// for the list view.
pub async fn post_message(
    state: &AppState,
    session_id: Uuid,
    id: Option<Uuid>,
    sender: Sender,
    text: String,
    attachments: Vec<Attachment>,
) -> ApiResult<ChatMessage> {
    let (session, message) =
        store::append_message(&state.pool, session_id, id, sender, text, attachments).await?;

    state
        .ws
        .rooms
        .broadcast(
            &Topic::Session(session_id),
            ServerEvent::NewMessage {
                session_id,
                message: message.clone(),
            },
        )
        .await;

    let preview_text = if message.body.is_empty() {
        None
    } else {
        Some(preview(&message.body))
    };
    broadcast_summary(state, SessionSummary::from_session(&session, preview_text)).await;

    tracing::info!(
        session_id = %session_id,
        message_id = %message.id,
        sender = sender.as_str(),
        "Chat message persisted"
    );

    Ok(message)
}

/// Push a session summary to the agents room (list refresh)
pub async fn broadcast_summary(state: &AppState, summary: SessionSummary) {
    state
        .ws
        .rooms
        .broadcast(&Topic::Agents, ServerEvent::SessionUpdated { session: summary })
        .await;
}

/// Build and broadcast a summary for a session whose latest message is not
/// already at hand (creation, assignment)
pub async fn broadcast_session_changed(state: &AppState, session: &ChatSession) -> ApiResult<()> {
    let preview_text = store::latest_preview(&state.pool, session.id).await?;
    broadcast_summary(state, SessionSummary::from_session(session, preview_text)).await;
    Ok(())
}
