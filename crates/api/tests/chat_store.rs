//! Session store and lifecycle integration tests
//!
//! These exercise the Postgres-backed store end to end and therefore need a
//! database: `DATABASE_URL=postgres://... cargo test -- --ignored`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sqlx::PgPool;
use uuid::Uuid;

use stayline_api::chat::{assignment, store, store::CustomerIdentity};
use stayline_api::error::ApiError;
use stayline_api::websocket::presence::PresenceRegistry;
use stayline_shared::{Attachment, Sender, SessionStatus, RETENTION_WINDOW};

async fn setup() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let pool = stayline_shared::create_pool(&url, 3).await.expect("pool");
    stayline_shared::run_migrations(&pool).await.expect("migrations");
    pool
}

fn attachment() -> Attachment {
    Attachment {
        id: Uuid::new_v4(),
        url: "https://cdn.example.com/uploads/abc.png".to_string(),
        filename: "abc.png".to_string(),
        mime_type: "image/png".to_string(),
        size_bytes: 512,
    }
}

#[tokio::test]
#[ignore] // Requires database
async fn test_idempotent_resume() {
    let pool = setup().await;

    // First contact with no visitor id mints a session and a token
    let first = store::create_session(&pool, None, CustomerIdentity::default())
        .await
        .unwrap();
    assert_eq!(first.status, SessionStatus::Open);
    assert!(first.assigned_agent_id.is_none());

    // Replaying the returned visitor id resumes the same session
    let second = store::create_session(
        &pool,
        Some(first.visitor_id.clone()),
        CustomerIdentity::default(),
    )
    .await
    .unwrap();
    assert_eq!(second.id, first.id);
}

#[tokio::test]
#[ignore] // Requires database
async fn test_append_extends_ttl() {
    let pool = setup().await;

    let session = store::create_session(&pool, None, CustomerIdentity::default())
        .await
        .unwrap();
    let before = session.expires_at;

    let (updated, message) = store::append_message(
        &pool,
        session.id,
        None,
        Sender::Visitor,
        "hello".to_string(),
        vec![],
    )
    .await
    .unwrap();

    assert_eq!(updated.last_message_at, Some(message.created_at));
    assert_eq!(updated.expires_at, message.created_at + RETENTION_WINDOW);
    assert!(updated.expires_at > before);
}

#[tokio::test]
#[ignore] // Requires database
async fn test_append_to_unknown_session_is_not_found() {
    let pool = setup().await;

    let err = store::append_message(
        &pool,
        Uuid::new_v4(),
        None,
        Sender::Visitor,
        "hello".to_string(),
        vec![],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
}

#[tokio::test]
#[ignore] // Requires database
async fn test_append_redelivery_is_idempotent() {
    let pool = setup().await;

    let session = store::create_session(&pool, None, CustomerIdentity::default())
        .await
        .unwrap();
    let message_id = Uuid::new_v4();

    for _ in 0..2 {
        store::append_message(
            &pool,
            session.id,
            Some(message_id),
            Sender::Visitor,
            "retry me".to_string(),
            vec![],
        )
        .await
        .unwrap();
    }

    let history = store::list_messages(&pool, session.id).await.unwrap();
    assert_eq!(history.iter().filter(|m| m.id == message_id).count(), 1);
}

#[tokio::test]
#[ignore] // Requires database
async fn test_message_validity_at_the_store_boundary() {
    let pool = setup().await;

    let session = store::create_session(&pool, None, CustomerIdentity::default())
        .await
        .unwrap();

    // Empty text and no attachments never persists
    let err = store::append_message(
        &pool,
        session.id,
        None,
        Sender::Visitor,
        String::new(),
        vec![],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    // Attachment-only message is accepted and survives a history read
    let (_, message) = store::append_message(
        &pool,
        session.id,
        None,
        Sender::Visitor,
        String::new(),
        vec![attachment()],
    )
    .await
    .unwrap();

    let history = store::list_messages(&pool, session.id).await.unwrap();
    let stored = history.iter().find(|m| m.id == message.id).unwrap();
    assert_eq!(stored.attachments.len(), 1);
    assert_eq!(stored.attachments[0].mime_type, "image/png");
}

#[tokio::test]
#[ignore] // Requires database
async fn test_assignment_conflict_and_force_takeover() {
    let pool = setup().await;
    let presence = PresenceRegistry::new();

    let session = store::create_session(&pool, None, CustomerIdentity::default())
        .await
        .unwrap();
    let agent_a = Uuid::new_v4();
    let agent_b = Uuid::new_v4();

    // Explicit assignment to A
    let (assigned, transitioned) =
        assignment::assign(&pool, &presence, session.id, Some(agent_a), false)
            .await
            .unwrap();
    assert!(transitioned);
    assert_eq!(assigned.status, SessionStatus::Assigned);
    assert_eq!(assigned.assigned_agent_id, Some(agent_a));

    // B without force hits a conflict and A keeps the session
    let err = assignment::assign(&pool, &presence, session.id, Some(agent_b), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    let current = store::get_session(&pool, session.id).await.unwrap();
    assert_eq!(current.assigned_agent_id, Some(agent_a));

    // Re-assigning A is an idempotent no-op success
    let (same, transitioned) =
        assignment::assign(&pool, &presence, session.id, Some(agent_a), false)
            .await
            .unwrap();
    assert!(!transitioned);
    assert_eq!(same.assigned_agent_id, Some(agent_a));

    // B with force takes over
    let (taken, transitioned) =
        assignment::assign(&pool, &presence, session.id, Some(agent_b), true)
            .await
            .unwrap();
    assert!(transitioned);
    assert_eq!(taken.assigned_agent_id, Some(agent_b));
}

#[tokio::test]
#[ignore] // Requires database
async fn test_auto_assign_requires_a_present_agent() {
    let pool = setup().await;
    let presence = PresenceRegistry::new();

    let session = store::create_session(&pool, None, CustomerIdentity::default())
        .await
        .unwrap();

    // Nobody connected: distinct from a conflict
    let err = assignment::assign(&pool, &presence, session.id, None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NoAgentAvailable));

    // Least-loaded present agent wins
    let idle = Uuid::new_v4();
    let busy = Uuid::new_v4();
    presence.register_agent(idle).await;
    presence.register_agent(busy).await;
    for _ in 0..3 {
        presence.join_session(busy, Uuid::new_v4()).await;
    }

    let (assigned, _) = assignment::assign(&pool, &presence, session.id, None, false)
        .await
        .unwrap();
    assert_eq!(assigned.assigned_agent_id, Some(idle));
}

#[tokio::test]
#[ignore] // Requires database
async fn test_identity_binding_leaves_messages_and_status_alone() {
    let pool = setup().await;

    let session = store::create_session(&pool, None, CustomerIdentity::default())
        .await
        .unwrap();
    store::append_message(
        &pool,
        session.id,
        None,
        Sender::Visitor,
        "hi".to_string(),
        vec![],
    )
    .await
    .unwrap();

    let updated = store::update_customer_identity(
        &pool,
        session.id,
        CustomerIdentity {
            customer_email: Some("guest@example.com".to_string()),
            customer_phone: None,
            auth_provider: Some("google".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.customer_email.as_deref(), Some("guest@example.com"));
    assert_eq!(updated.status, SessionStatus::Open);
    assert_eq!(store::list_messages(&pool, session.id).await.unwrap().len(), 1);

    // A later partial update merges instead of clearing
    let merged = store::update_customer_identity(
        &pool,
        session.id,
        CustomerIdentity {
            customer_email: None,
            customer_phone: Some("+15550100".to_string()),
            auth_provider: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(merged.customer_email.as_deref(), Some("guest@example.com"));
    assert_eq!(merged.customer_phone.as_deref(), Some("+15550100"));
}

#[tokio::test]
#[ignore] // Requires database
async fn test_list_sessions_orders_by_activity() {
    let pool = setup().await;

    let older = store::create_session(&pool, None, CustomerIdentity::default())
        .await
        .unwrap();
    let newer = store::create_session(&pool, None, CustomerIdentity::default())
        .await
        .unwrap();

    // A message on the older session moves it to the front
    store::append_message(
        &pool,
        older.id,
        None,
        Sender::Visitor,
        "bump".to_string(),
        vec![],
    )
    .await
    .unwrap();

    let sessions = store::list_sessions(&pool).await.unwrap();
    let pos_older = sessions.iter().position(|s| s.id == older.id).unwrap();
    let pos_newer = sessions.iter().position(|s| s.id == newer.id).unwrap();
    assert!(pos_older < pos_newer);

    let bumped = &sessions[pos_older];
    assert_eq!(bumped.last_message_preview.as_deref(), Some("bump"));
}
