//! Shared application state

use sqlx::PgPool;

use crate::blob::BlobStorage;
use crate::config::Config;
use crate::websocket::WebSocketState;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,

    /// Realtime gateway state: connections, rooms, presence, typing.
    /// Constructed here (not a module-level singleton) so tests can build
    /// isolated instances.
    pub ws: WebSocketState,

    /// Attachment blob store
    pub blobs: BlobStorage,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Self {
        let blobs = BlobStorage::new(&config.upload_dir, &config.public_url);
        Self {
            config,
            pool,
            ws: WebSocketState::new(),
            blobs,
        }
    }
}
