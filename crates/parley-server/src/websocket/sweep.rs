//! Idle session sweeper.
//!
//! Periodically scans the registry: sessions idle past the warning
//! threshold get a one-time `server.idle_warning`, sessions idle past
//! the timeout get a `server.timeout` and are force-closed. Any client
//! activity resets both.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, info};

use crate::events::ServerEvent;

use super::registry::ConnectionRegistry;

/// Spawn the background sweep task. Runs until the process exits.
pub fn spawn_idle_sweeper(
    registry: Arc<ConnectionRegistry>,
    sweep_interval: Duration,
    idle_warning: Duration,
    session_timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(sweep_interval);
        loop {
            let _ = timer.tick().await;
            sweep_once(&registry, idle_warning, session_timeout).await;
        }
    })
}

/// One pass over the registry.
async fn sweep_once(
    registry: &ConnectionRegistry,
    idle_warning: Duration,
    session_timeout: Duration,
) {
    for conn in registry.snapshot().await {
        let idle = conn.idle_for();
        if idle >= session_timeout {
            info!(connection_id = %conn.id, idle_secs = idle.as_secs(), "idle session timed out");
            counter!("ws_idle_timeouts_total").increment(1);
            let _ = conn.send(
                ServerEvent::Timeout {
                    idle_secs: idle.as_secs(),
                }
                .to_json(),
            );
            conn.shutdown.cancel();
        } else if idle >= idle_warning && conn.arm_idle_warning() {
            debug!(connection_id = %conn.id, idle_secs = idle.as_secs(), "idle warning sent");
            let _ = conn.send(
                ServerEvent::IdleWarning {
                    idle_secs: idle.as_secs(),
                }
                .to_json(),
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
