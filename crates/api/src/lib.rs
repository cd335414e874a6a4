//! Stayline Chat API Library
//!
//! This crate contains the support-chat server components for Stayline.

pub mod blob;
pub mod chat;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
