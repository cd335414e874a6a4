//! Session Store
//!
//! Durable chat sessions and their message history, with a sliding
//! expiration. Every read filters on `expires_at > NOW()`, so a session past
//! its window is unreachable even before the worker physically deletes it.

use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use stayline_shared::{
    preview, validate_message_content, Attachment, ChatMessage, ChatSession, Sender,
    SessionStatus, SessionSummary, RETENTION_WINDOW,
};

use crate::error::{ApiError, ApiResult};

/// Identity fields bound to a session after the visitor authenticates.
/// Opaque to the chat core; supplied by the identity collaborator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerIdentity {
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub auth_provider: Option<String>,
}

const SESSION_COLUMNS: &str = "id, visitor_id, customer_email, customer_phone, auth_provider, \
     status, assigned_agent_id, created_at, last_message_at, expires_at";

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    visitor_id: String,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    auth_provider: Option<String>,
    status: String,
    assigned_agent_id: Option<Uuid>,
    created_at: OffsetDateTime,
    last_message_at: Option<OffsetDateTime>,
    expires_at: OffsetDateTime,
}

impl TryFrom<SessionRow> for ChatSession {
    type Error = ApiError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let status = SessionStatus::parse(&row.status).ok_or(ApiError::Internal)?;
        Ok(ChatSession {
            id: row.id,
            visitor_id: row.visitor_id,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            auth_provider: row.auth_provider,
            status,
            assigned_agent_id: row.assigned_agent_id,
            created_at: row.created_at,
            last_message_at: row.last_message_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    session_id: Uuid,
    sender: String,
    body: String,
    attachments: serde_json::Value,
    created_at: OffsetDateTime,
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = ApiError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let sender = Sender::parse(&row.sender).ok_or(ApiError::Internal)?;
        let attachments: Vec<Attachment> =
            serde_json::from_value(row.attachments).map_err(|_| ApiError::Internal)?;
        Ok(ChatMessage {
            id: row.id,
            session_id: row.session_id,
            sender,
            body: row.body,
            attachments,
            created_at: row.created_at,
        })
    }
}

/// Stable pseudonymous token minted for a visitor's first contact; the
/// client stores it and replays it to resume.
fn generate_visitor_token() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("v_{}", token)
}

/// Create a session, or resume the visitor's existing unexpired one.
/// Identity fields are applied only when a fresh session is minted; a
/// resumed session is returned unchanged.
pub async fn create_session(
    pool: &PgPool,
    visitor_id: Option<String>,
    identity: CustomerIdentity,
) -> ApiResult<ChatSession> {
    if let Some(ref vid) = visitor_id {
        let existing: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE visitor_id = $1 AND expires_at > NOW() \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(vid)
        .fetch_optional(pool)
        .await?;

        if let Some(row) = existing {
            tracing::debug!(session_id = %row.id, visitor_id = %vid, "Resumed chat session");
            return row.try_into();
        }
    }

    let visitor_id = visitor_id.unwrap_or_else(generate_visitor_token);
    let now = OffsetDateTime::now_utc();

    let row: SessionRow = sqlx::query_as(&format!(
        "INSERT INTO chat_sessions \
           (visitor_id, customer_email, customer_phone, auth_provider, created_at, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(&visitor_id)
    .bind(&identity.customer_email)
    .bind(&identity.customer_phone)
    .bind(&identity.auth_provider)
    .bind(now)
    .bind(now + RETENTION_WINDOW)
    .fetch_one(pool)
    .await?;

    tracing::info!(session_id = %row.id, "Chat session created");
    row.try_into()
}

/// Fetch an unexpired session by id
pub async fn get_session(pool: &PgPool, session_id: Uuid) -> ApiResult<ChatSession> {
    let row: Option<SessionRow> = sqlx::query_as(&format!(
        "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = $1 AND expires_at > NOW()"
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    row.ok_or(ApiError::NotFound)?.try_into()
}

/// Whether an unexpired session exists (handshake and intake checks)
pub async fn session_exists(pool: &PgPool, session_id: Uuid) -> ApiResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM chat_sessions WHERE id = $1 AND expires_at > NOW())",
    )
    .bind(session_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    visitor_id: String,
    status: String,
    assigned_agent_id: Option<Uuid>,
    created_at: OffsetDateTime,
    last_message_at: Option<OffsetDateTime>,
    expires_at: OffsetDateTime,
    last_body: Option<String>,
}

/// All unexpired sessions, newest activity first, for the agent list view
pub async fn list_sessions(pool: &PgPool) -> ApiResult<Vec<SessionSummary>> {
    let rows: Vec<SummaryRow> = sqlx::query_as(
        r#"
        SELECT s.id, s.visitor_id, s.status, s.assigned_agent_id,
               s.created_at, s.last_message_at, s.expires_at,
               m.body AS last_body
        FROM chat_sessions s
        LEFT JOIN LATERAL (
            SELECT body FROM chat_messages
            WHERE session_id = s.id
            ORDER BY created_at DESC
            LIMIT 1
        ) m ON TRUE
        WHERE s.expires_at > NOW()
        ORDER BY COALESCE(s.last_message_at, s.created_at) DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let status = SessionStatus::parse(&row.status).ok_or(ApiError::Internal)?;
            Ok(SessionSummary {
                id: row.id,
                visitor_id: row.visitor_id,
                status,
                assigned_agent_id: row.assigned_agent_id,
                created_at: row.created_at,
                last_message_at: row.last_message_at,
                expires_at: row.expires_at,
                last_message_preview: row.last_body.as_deref().filter(|b| !b.is_empty()).map(preview),
            })
        })
        .collect()
}

/// Append a message atomically: insert + touch `last_message_at` and
/// `expires_at` in one transaction. Unknown or expired sessions error —
/// never silently created. Re-delivery of an already-persisted message id
/// is a no-op insert, so clients may safely retry.
pub async fn append_message(
    pool: &PgPool,
    session_id: Uuid,
    id: Option<Uuid>,
    sender: Sender,
    body: String,
    attachments: Vec<Attachment>,
) -> ApiResult<(ChatSession, ChatMessage)> {
    // Reject before any persistence side effect
    validate_message_content(&body, &attachments)?;

    let message_id = id.unwrap_or_else(Uuid::new_v4);
    let created_at = OffsetDateTime::now_utc();

    let mut tx = pool.begin().await?;

    let row: Option<SessionRow> = sqlx::query_as(&format!(
        "UPDATE chat_sessions SET last_message_at = $2, expires_at = $3 \
         WHERE id = $1 AND expires_at > NOW() \
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(session_id)
    .bind(created_at)
    .bind(created_at + RETENTION_WINDOW)
    .fetch_optional(&mut *tx)
    .await?;

    // Dropping the open transaction rolls the touch back
    let Some(row) = row else {
        return Err(ApiError::NotFound);
    };

    let attachments_json = serde_json::to_value(&attachments).map_err(|_| ApiError::Internal)?;
    sqlx::query(
        "INSERT INTO chat_messages (id, session_id, sender, body, attachments, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(message_id)
    .bind(session_id)
    .bind(sender.as_str())
    .bind(&body)
    .bind(attachments_json)
    .bind(created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let message = ChatMessage {
        id: message_id,
        session_id,
        sender,
        body,
        attachments,
        created_at,
    };
    Ok((row.try_into()?, message))
}

/// Full message history for a session, chronological
pub async fn list_messages(pool: &PgPool, session_id: Uuid) -> ApiResult<Vec<ChatMessage>> {
    if !session_exists(pool, session_id).await? {
        return Err(ApiError::NotFound);
    }

    let rows: Vec<MessageRow> = sqlx::query_as(
        "SELECT id, session_id, sender, body, attachments, created_at \
         FROM chat_messages WHERE session_id = $1 ORDER BY created_at ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}

/// Merge identity fields into a session without touching messages or status
pub async fn update_customer_identity(
    pool: &PgPool,
    session_id: Uuid,
    identity: CustomerIdentity,
) -> ApiResult<ChatSession> {
    let row: Option<SessionRow> = sqlx::query_as(&format!(
        "UPDATE chat_sessions SET \
           customer_email = COALESCE($2, customer_email), \
           customer_phone = COALESCE($3, customer_phone), \
           auth_provider  = COALESCE($4, auth_provider) \
         WHERE id = $1 AND expires_at > NOW() \
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(session_id)
    .bind(&identity.customer_email)
    .bind(&identity.customer_phone)
    .bind(&identity.auth_provider)
    .fetch_optional(pool)
    .await?;

    let session: ChatSession = row.ok_or(ApiError::NotFound)?.try_into()?;
    tracing::info!(session_id = %session_id, "Customer identity bound to chat session");
    Ok(session)
}

/// Record an assignment. The transition doubles as a keep-alive touch, so
/// the expiry window restarts.
pub async fn set_assignment(
    pool: &PgPool,
    session_id: Uuid,
    agent_id: Uuid,
) -> ApiResult<ChatSession> {
    let now = OffsetDateTime::now_utc();
    let row: Option<SessionRow> = sqlx::query_as(&format!(
        "UPDATE chat_sessions SET \
           status = 'assigned', assigned_agent_id = $2, expires_at = $3 \
         WHERE id = $1 AND expires_at > NOW() \
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(session_id)
    .bind(agent_id)
    .bind(now + RETENTION_WINDOW)
    .fetch_optional(pool)
    .await?;

    row.ok_or(ApiError::NotFound)?.try_into()
}

/// Body of the newest message, for summary broadcasts outside the message
/// path (assignment, creation)
pub async fn latest_preview(pool: &PgPool, session_id: Uuid) -> ApiResult<Option<String>> {
    let body: Option<String> = sqlx::query_scalar(
        "SELECT body FROM chat_messages WHERE session_id = $1 \
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(body.as_deref().filter(|b| !b.is_empty()).map(preview))
}
