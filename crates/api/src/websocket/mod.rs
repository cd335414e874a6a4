//! WebSocket support for the live visitor chat
//!
//! Provides the realtime gateway between visitors and support agents:
//! - Topic-based pub/sub (per-session rooms plus the `agents` broadcast group)
//! - Agent presence tracking (who is connected, which sessions they view)
//! - Typing indicators
//! - Real-time message delivery
//!
//! # Architecture
//!
//! - **Connection**: Represents one physical WebSocket connection
//! - **Room**: Topic-based pub/sub for broadcasting events
//! - **Presence**: Process-local registry of connected agents
//! - **Typing**: Ephemeral per-session typing state
//! - **State**: Gateway state shared across all connections
//! - **Handler**: Axum WebSocket route handler
//! - **Events**: Type-safe event definitions for client/server communication

pub mod connection;
pub mod events;
pub mod handler;
pub mod presence;
pub mod room;
pub mod state;
pub mod typing;

pub use handler::ws_handler;
pub use room::Topic;
pub use state::WebSocketState;
