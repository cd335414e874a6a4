//! Error types for Stayline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StaylineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for StaylineError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StaylineError::NotFound("row not found".to_string()),
            other => StaylineError::Storage(other.to_string()),
        }
    }
}
