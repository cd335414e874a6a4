//! Stayline maintenance worker
//!
//! Runs the storage-level expiry mechanism for chat sessions: an interval
//! loop that permanently deletes sessions past their sliding TTL. The API
//! never serves expired sessions regardless of when this runs; the worker
//! only reclaims the storage.

use std::time::Duration;

use anyhow::Context;

mod reaper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stayline_worker=info".into()),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
    let interval_secs: u64 = std::env::var("REAPER_INTERVAL_SECS")
        .unwrap_or_else(|_| "300".to_string())
        .parse()
        .unwrap_or(300);

    let pool = stayline_shared::create_pool(&database_url, 2)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(interval_secs, "Stayline worker started");

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        // Errors are logged and swallowed so the loop survives transient
        // database failures
        match reaper::reap_expired_sessions(&pool).await {
            Ok(0) => {}
            Ok(deleted) => tracing::info!(deleted, "Reaped expired chat sessions"),
            Err(e) => tracing::error!(error = %e, "Failed to reap expired chat sessions"),
        }
    }
}
