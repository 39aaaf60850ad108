//! Connection registry keyed by conversation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::connection::ClientConnection;
use crate::events::ServerEvent;

/// Registry of live WebSocket connections, grouped by conversation key.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection.
    pub async fn add(&self, conn: Arc<ClientConnection>) {
        let _ = self
            .connections
            .write()
            .await
            .insert(conn.id.clone(), Arc::clone(&conn));
        metrics::gauge!("ws_connections_active").increment(1.0);
        debug!(connection_id = %conn.id, conversation = %conn.conversation_key, "connection registered");
    }

    /// Remove a connection by ID.
    pub async fn remove(&self, connection_id: &str) {
        if self.connections.write().await.remove(connection_id).is_some() {
            metrics::gauge!("ws_connections_active").decrement(1.0);
            debug!(connection_id, "connection removed");
        }
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send an event to every connection in a conversation. Returns the
    /// number of connections the event was queued for.
    pub async fn broadcast(&self, conversation_key: &str, event: &ServerEvent) -> usize {
        let payload = event.to_json();
        let targets: Vec<Arc<ClientConnection>> = {
            let guard = self.connections.read().await;
            guard
                .values()
                .filter(|c| c.conversation_key == conversation_key)
                .cloned()
                .collect()
        };
        let mut delivered = 0;
        for conn in targets {
            if conn.send(payload.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Snapshot of all connections, for the idle sweeper.
    pub async fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.connections.read().await.values().cloned().collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
