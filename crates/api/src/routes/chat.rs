//! Chat session routes
//!
//! The request/response surface of the support chat: session
//! create-or-resume, identity binding, the agent list view, assignment,
//! history, the non-socket message path, and attachment upload. Mutating
//! handlers emit the same realtime events as the socket path.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stayline_shared::{Attachment, ChatMessage, ChatSession, Sender, SessionSummary};

use crate::{
    chat::{self, assignment, attachments, store, store::CustomerIdentity},
    error::ApiResult,
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Returned by an earlier create; replaying it resumes the session
    pub visitor_id: Option<String>,
    #[serde(flatten)]
    pub identity: CustomerIdentity,
}

#[derive(Debug, Serialize)]
pub struct SessionsListResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    /// Explicit assignee; omitted means auto-pick the least-loaded present agent
    pub agent_id: Option<Uuid>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct AppendMessageRequest {
    /// Client-assigned message id for optimistic rendering
    pub id: Option<Uuid>,
    pub sender: Sender,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a session, or resume the visitor's existing unexpired one
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<Json<ChatSession>> {
    let session = store::create_session(&state.pool, req.visitor_id, req.identity).await?;
    chat::broadcast_session_changed(&state, &session).await?;
    Ok(Json(session))
}

/// Bind or update customer identity on a session
pub async fn update_identity(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(identity): Json<CustomerIdentity>,
) -> ApiResult<Json<ChatSession>> {
    let session = store::update_customer_identity(&state.pool, session_id, identity).await?;
    Ok(Json(session))
}

/// List sessions for the agent dashboard, newest activity first
pub async fn list_sessions(State(state): State<AppState>) -> ApiResult<Json<SessionsListResponse>> {
    let sessions = store::list_sessions(&state.pool).await?;
    Ok(Json(SessionsListResponse { sessions }))
}

/// Assign or reassign a session to an agent
pub async fn assign_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> ApiResult<Json<ChatSession>> {
    let (session, transitioned) = assignment::assign(
        &state.pool,
        &state.ws.presence,
        session_id,
        req.agent_id,
        req.force,
    )
    .await?;

    if transitioned {
        chat::broadcast_session_changed(&state, &session).await?;
    }

    Ok(Json(session))
}

/// Fetch the full message history for a session
pub async fn get_messages(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<MessagesResponse>> {
    let messages = store::list_messages(&state.pool, session_id).await?;
    Ok(Json(MessagesResponse { messages }))
}

/// Append a message outside the socket path (initial page load, bots).
/// Persistence and fan-out are identical to the socket `message` event.
pub async fn append_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<AppendMessageRequest>,
) -> ApiResult<Json<ChatMessage>> {
    let message = chat::post_message(
        &state,
        session_id,
        req.id,
        req.sender,
        req.text,
        req.attachments,
    )
    .await?;
    Ok(Json(message))
}

/// Upload one attachment scoped to a session. Returns a descriptor the
/// client references from a subsequent message.
pub async fn upload_attachment(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<Attachment>> {
    let upload = attachments::read_upload(multipart).await?;
    let attachment = attachments::intake(&state, session_id, upload).await?;
    Ok(Json(attachment))
}
