//! # parley-server
//!
//! Axum HTTP + `WebSocket` server for Parley chat sessions.
//!
//! - HTTP endpoints: health check, `WebSocket` upgrade
//! - Session lifecycle: welcome event, heartbeat, idle warning and timeout
//! - Per-conversation fan-out via the connection registry
//! - Inbound deduplication over the shared key-value store
//! - Errors reach clients as `server.error` events; the connection stays
//!   open

#![deny(unsafe_code)]

pub mod dedup;
pub mod events;
pub mod health;
pub mod router;
pub mod state;
pub mod websocket;

pub use dedup::Deduplicator;
pub use events::{ClientEvent, ServerEvent};
pub use router::build_router;
pub use state::AppState;
pub use websocket::registry::ConnectionRegistry;
pub use websocket::sweep::spawn_idle_sweeper;
