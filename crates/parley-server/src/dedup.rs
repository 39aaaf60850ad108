//! Inbound message deduplication.
//!
//! Upstream transports deliver at-least-once, so the same text can
//! arrive twice within moments. The fingerprint hashes the text together
//! with a coarse time bucket; a fingerprint seen within the window is
//! dropped silently. The fingerprint deliberately ignores connection
//! identity, so the same text from two connections in the same bucket is
//! suppressed as one message.

use std::sync::Arc;
use std::time::Duration;

use parley_core::kv::{KvResult, KvStore};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Suppresses repeated inbound messages over a shared store.
pub struct Deduplicator {
    kv: Arc<dyn KvStore>,
    window_secs: u64,
}

impl Deduplicator {
    /// Create a deduplicator with the given bucket width.
    pub fn new(kv: Arc<dyn KvStore>, window_secs: u64) -> Self {
        Self { kv, window_secs }
    }

    /// Check-and-mark one inbound text.
    ///
    /// Returns `true` when the message is a duplicate and must be
    /// dropped. A fresh message is marked seen before returning.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails; callers treat that as
    /// "not a duplicate" so a store outage never eats messages.
    pub async fn is_duplicate(&self, text: &str) -> KvResult<bool> {
        self.check_at(text, chrono::Utc::now().timestamp()).await
    }

    async fn check_at(&self, text: &str, now_secs: i64) -> KvResult<bool> {
        let key = self.fingerprint(text, now_secs);
        if self.kv.exists(&key).await? {
            debug!("duplicate message suppressed");
            metrics::counter!("ws_duplicates_suppressed_total").increment(1);
            return Ok(true);
        }
        self.kv
            .set_with_ttl(&key, "1", Duration::from_secs(self.window_secs))
            .await?;
        Ok(false)
    }

    fn fingerprint(&self, text: &str, now_secs: i64) -> String {
        let window = i64::try_from(self.window_secs).unwrap_or(i64::MAX).max(1);
        let bucket = now_secs / window;
        let digest = Sha256::digest(format!("{text}:{bucket}").as_bytes());
        format!("parley:dedup:{digest:x}")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
