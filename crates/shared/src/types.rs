//! Chat domain types shared between the API server and the worker

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// How long a session stays reachable after its last activity.
/// Every message (and every assignment touch) extends the window.
pub const RETENTION_WINDOW: Duration = Duration::days(30);

/// Hard ceiling for a single uploaded attachment.
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Length of the message preview carried in session summaries.
pub const PREVIEW_CHARS: usize = 140;

// =============================================================================
// Enums
// =============================================================================

/// Session assignment state. `Assigned` always carries an agent id;
/// `Open` never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Assigned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Assigned => "assigned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(SessionStatus::Open),
            "assigned" => Some(SessionStatus::Assigned),
            _ => None,
        }
    }
}

/// Who authored a message. Two variants only, not free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Visitor,
    Admin,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Visitor => "visitor",
            Sender::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "visitor" => Some(Sender::Visitor),
            "admin" => Some(Sender::Admin),
            _ => None,
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// File reference embedded in a message. All five fields must be populated
/// or the owning message is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub url: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

impl Attachment {
    /// An attachment with a blank url/filename/mime or a non-positive size
    /// is incomplete and invalidates the whole message.
    pub fn is_complete(&self) -> bool {
        !self.url.is_empty()
            && !self.filename.is_empty()
            && !self.mime_type.is_empty()
            && self.size_bytes > 0
    }
}

/// A single chat message. `created_at` is server-assigned and authoritative
/// for ordering; `id` is client-assigned for optimistic rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sender: Sender,
    pub body: String,
    pub attachments: Vec<Attachment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// One visitor's support conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub visitor_id: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub auth_provider: Option<String>,
    pub status: SessionStatus,
    pub assigned_agent_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// Condensed session state broadcast to the agents topic and returned by the
/// list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub visitor_id: String,
    pub status: SessionStatus,
    pub assigned_agent_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub last_message_preview: Option<String>,
}

impl SessionSummary {
    pub fn from_session(session: &ChatSession, last_message_preview: Option<String>) -> Self {
        Self {
            id: session.id,
            visitor_id: session.visitor_id.clone(),
            status: session.status,
            assigned_agent_id: session.assigned_agent_id,
            created_at: session.created_at,
            last_message_at: session.last_message_at,
            expires_at: session.expires_at,
            last_message_preview,
        }
    }
}

/// Lightweight agent identity shown in typing indicators and viewer lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

// =============================================================================
// Validation
// =============================================================================

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum MessageContentError {
    #[error("message must contain text or at least one attachment")]
    Empty,
    #[error("attachment is missing required fields")]
    IncompleteAttachment,
}

/// Validate message content before any persistence side effect: non-empty
/// text OR at least one attachment, and every attachment complete.
pub fn validate_message_content(
    body: &str,
    attachments: &[Attachment],
) -> Result<(), MessageContentError> {
    if body.trim().is_empty() && attachments.is_empty() {
        return Err(MessageContentError::Empty);
    }
    if attachments.iter().any(|a| !a.is_complete()) {
        return Err(MessageContentError::IncompleteAttachment);
    }
    Ok(())
}

/// First [`PREVIEW_CHARS`] characters of a message body, for list rendering.
pub fn preview(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment() -> Attachment {
        Attachment {
            id: Uuid::new_v4(),
            url: "https://cdn.example.com/uploads/abc123.png".to_string(),
            filename: "screenshot.png".to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: 2048,
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [SessionStatus::Open, SessionStatus::Assigned] {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::parse("closed"), None);
    }

    #[test]
    fn test_sender_round_trip() {
        for sender in [Sender::Visitor, Sender::Admin] {
            assert_eq!(Sender::parse(sender.as_str()), Some(sender));
        }
        assert_eq!(Sender::parse("bot"), None);
    }

    #[test]
    fn test_empty_message_rejected() {
        assert_eq!(
            validate_message_content("", &[]),
            Err(MessageContentError::Empty)
        );
        assert_eq!(
            validate_message_content("   ", &[]),
            Err(MessageContentError::Empty)
        );
    }

    #[test]
    fn test_text_only_message_accepted() {
        assert!(validate_message_content("hello", &[]).is_ok());
    }

    #[test]
    fn test_attachment_only_message_accepted() {
        assert!(validate_message_content("", &[attachment()]).is_ok());
    }

    #[test]
    fn test_incomplete_attachment_rejects_whole_message() {
        let mut broken = attachment();
        broken.filename = String::new();
        assert_eq!(
            validate_message_content("has text too", &[attachment(), broken]),
            Err(MessageContentError::IncompleteAttachment)
        );

        let mut zero_sized = attachment();
        zero_sized.size_bytes = 0;
        assert_eq!(
            validate_message_content("", &[zero_sized]),
            Err(MessageContentError::IncompleteAttachment)
        );
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS);

        assert_eq!(preview("short"), "short");
    }
}
