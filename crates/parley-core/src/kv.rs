//! Shared key-value store abstraction.
//!
//! The cost ledger, dedup store, and response cache all live in one
//! externally-owned key-value store. Correctness under concurrency relies
//! on the store's own atomic set-with-expiry / increment-with-expiry
//! primitives rather than application-level locking, so the trait surface
//! is deliberately exactly those primitives.
//!
//! [`MemoryKv`] is the in-process implementation used by tests and
//! single-node deployments; a networked store (e.g. Redis) slots in behind
//! the same trait.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

/// Errors from the key-value store.
#[derive(Debug, Error)]
pub enum KvError {
    /// The stored value could not be interpreted for the requested
    /// operation (e.g. incrementing a non-integer value).
    #[error("value at '{key}' is not an integer")]
    NotAnInteger {
        /// Offending key.
        key: String,
    },
    /// The backing store is unreachable or misbehaving.
    #[error("kv backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type KvResult<T> = Result<T, KvError>;

/// Minimal contract over the shared key-value store.
///
/// Every write carries a TTL; nothing in this system stores unexpiring
/// keys. Increment must be atomic with respect to concurrent callers.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a value, `None` if absent or expired.
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Set a value with an expiry.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()>;

    /// Atomically add `delta` to an integer value, creating it with the
    /// given TTL if absent. Returns the post-increment value. The TTL is
    /// only applied on creation (matching `INCR` + `EXPIRE NX` semantics).
    async fn incr_with_ttl(&self, key: &str, delta: i64, ttl: Duration) -> KvResult<i64>;

    /// Whether a live (unexpired) value exists for `key`.
    async fn exists(&self, key: &str) -> KvResult<bool>;
}

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// In-memory [`KvStore`] with lazy expiry.
///
/// Expired entries are dropped on access; [`MemoryKv::purge_expired`] can
/// be called from a maintenance task to bound memory between accesses.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, Entry>,
}

impl MemoryKv {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.live());
        before - self.entries.len()
    }

    /// Number of live entries (expired-but-unpurged entries excluded).
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().live()).count()
    }

    /// Whether the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        // Read under the shard guard, then drop it before removing the
        // expired entry to avoid a same-shard deadlock.
        let expired = match self.entries.get(key) {
            Some(entry) if entry.live() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            drop(self.entries.remove(key));
        }
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()> {
        let _ = self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn incr_with_ttl(&self, key: &str, delta: i64, ttl: Duration) -> KvResult<i64> {
        // The dashmap entry API serializes concurrent increments per key.
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: Instant::now() + ttl,
        });
        if !entry.live() {
            entry.value = "0".to_string();
            entry.expires_at = Instant::now() + ttl;
        }
        let current: i64 = entry.value.parse().map_err(|_| KvError::NotAnInteger {
            key: key.to_string(),
        })?;
        let next = current.saturating_add(delta);
        entry.value = next.to_string();
        Ok(next)
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const LONG: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn get_missing_returns_none() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("absent").await.unwrap(), None);
        assert!(!kv.exists("absent").await.unwrap());
    }

    #[tokio::test]
    async fn set_then_get() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("k", "v", LONG).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(kv.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn set_overwrites() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("k", "v1", LONG).await.unwrap();
        kv.set_with_ttl("k", "v2", LONG).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn expired_entry_is_gone() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("k", "v", Duration::from_millis(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(kv.get("k").await.unwrap(), None);
        assert!(!kv.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn incr_creates_and_accumulates() {
        let kv = MemoryKv::new();
        assert_eq!(kv.incr_with_ttl("n", 3, LONG).await.unwrap(), 3);
        assert_eq!(kv.incr_with_ttl("n", 4, LONG).await.unwrap(), 7);
        assert_eq!(kv.get("n").await.unwrap().as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn incr_negative_delta() {
        let kv = MemoryKv::new();
        let _ = kv.incr_with_ttl("n", 10, LONG).await.unwrap();
        assert_eq!(kv.incr_with_ttl("n", -4, LONG).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn incr_on_non_integer_errors() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("k", "not a number", LONG).await.unwrap();
        let err = kv.incr_with_ttl("k", 1, LONG).await.unwrap_err();
        assert_matches!(err, KvError::NotAnInteger { key } if key == "k");
    }

    #[tokio::test]
    async fn incr_restarts_after_expiry() {
        let kv = MemoryKv::new();
        let _ = kv
            .incr_with_ttl("n", 5, Duration::from_millis(5))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(kv.incr_with_ttl("n", 2, LONG).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn purge_removes_expired_only() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("short", "v", Duration::from_millis(5)).await.unwrap();
        kv.set_with_ttl("long", "v", LONG).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(kv.purge_expired(), 1);
        assert_eq!(kv.len(), 1);
        assert!(kv.exists("long").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_increments_are_atomic() {
        let kv = std::sync::Arc::new(MemoryKv::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let kv = kv.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let _ = kv.incr_with_ttl("counter", 1, LONG).await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(kv.get("counter").await.unwrap().as_deref(), Some("400"));
    }

    #[test]
    fn is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MemoryKv>();
    }
}
