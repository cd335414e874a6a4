//! Expired-session reaper

use sqlx::PgPool;

use stayline_shared::StaylineError;

/// Delete sessions past their expiry boundary, returning how many were
/// reclaimed. Message rows cascade via the foreign key.
pub async fn reap_expired_sessions(pool: &PgPool) -> Result<u64, StaylineError> {
    let done = sqlx::query("DELETE FROM chat_sessions WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;
    Ok(done.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_reap_is_idempotent() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = stayline_shared::create_pool(&url, 2).await.expect("pool");

        // A second pass right after the first has nothing left to delete
        reap_expired_sessions(&pool).await.expect("first pass");
        let deleted = reap_expired_sessions(&pool).await.expect("second pass");
        assert_eq!(deleted, 0);
    }
}
