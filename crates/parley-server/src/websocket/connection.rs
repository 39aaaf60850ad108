//! Per-connection state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A connected chat client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: String,
    /// Conversation key (room) this connection belongs to.
    pub conversation_key: String,
    /// Send channel to the connection's WebSocket write task.
    tx: mpsc::Sender<String>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has responded since the last ping frame.
    pub is_alive: AtomicBool,
    /// When the last client activity was seen.
    last_activity: Mutex<Instant>,
    /// Whether the one-time idle warning has been sent this idle period.
    warned: AtomicBool,
    /// Cancelled by the sweeper to force-close the session.
    pub shutdown: CancellationToken,
    /// Count of messages dropped due to a full channel.
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection.
    pub fn new(id: String, conversation_key: String, tx: mpsc::Sender<String>) -> Self {
        let now = Instant::now();
        Self {
            id,
            conversation_key,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_activity: Mutex::new(now),
            warned: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Queue a text message for the client.
    ///
    /// Returns `false` if the channel is full or closed, and increments
    /// the dropped message counter.
    pub fn send(&self, message: String) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Record client activity: refresh the idle clock and re-arm the
    /// idle warning.
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
        self.warned.store(false, Ordering::Relaxed);
    }

    /// Duration since the last client activity.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Arm the one-time idle warning. Returns `true` if this call won
    /// the right to send it.
    pub fn arm_idle_warning(&self) -> bool {
        !self.warned.swap(true, Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong or any frame received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
    }

    /// Check and reset the alive flag for the next ping cycle.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> (ClientConnection, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(2);
        (
            ClientConnection::new("c1".to_string(), "room-1".to_string(), tx),
            rx,
        )
    }

    #[test]
    fn send_queues_until_full() {
        let (conn, mut rx) = connection();
        assert!(conn.send("a".to_string()));
        assert!(conn.send("b".to_string()));
        assert!(!conn.send("c".to_string()));
        assert_eq!(conn.drop_count(), 1);
        assert_eq!(rx.try_recv().unwrap(), "a");
    }

    #[test]
    fn touch_rearms_the_idle_warning() {
        let (conn, _rx) = connection();
        assert!(conn.arm_idle_warning());
        assert!(!conn.arm_idle_warning());
        conn.touch();
        assert!(conn.arm_idle_warning());
    }

    #[test]
    fn alive_flag_is_check_and_reset() {
        let (conn, _rx) = connection();
        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
    }
}
