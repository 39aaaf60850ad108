//! Shared server state.

use std::sync::Arc;
use std::time::Instant;

use parley_runtime::Orchestrator;
use parley_settings::ParleySettings;

use crate::dedup::Deduplicator;
use crate::websocket::registry::ConnectionRegistry;

/// Everything a request handler needs, cloned per request via `Arc`.
pub struct AppState {
    /// Live WebSocket connections.
    pub registry: Arc<ConnectionRegistry>,
    /// The message pipeline.
    pub orchestrator: Arc<Orchestrator>,
    /// Inbound message deduplication.
    pub dedup: Arc<Deduplicator>,
    /// Resolved configuration.
    pub settings: ParleySettings,
    /// When the server started, for the health endpoint.
    pub started_at: Instant,
}
