//! Response cache over the shared key-value store.
//!
//! Identical requests within the TTL replay the finished answer instead
//! of paying for a new completion. The cache key is a SHA-256 digest of
//! the serialized request, so any change to model, messages, or sampling
//! parameters misses.

use std::sync::Arc;
use std::time::Duration;

use parley_core::kv::KvStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::provider::ChatRequest;

/// A finished answer stored for replay.
///
/// Only plain text answers are cached; completions that invoked tools
/// are side-effecting and never replayed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAnswer {
    /// Concatenated answer text.
    pub text: String,
}

/// Caches finished answers keyed by request digest.
pub struct ResponseCache {
    kv: Arc<dyn KvStore>,
    ttl_secs: u64,
}

impl ResponseCache {
    /// Create a cache over the shared store.
    pub fn new(kv: Arc<dyn KvStore>, ttl_secs: u64) -> Self {
        Self { kv, ttl_secs }
    }

    /// Look up a cached answer for `request`.
    ///
    /// A corrupt entry is treated as a miss.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails.
    pub async fn get(&self, request: &ChatRequest) -> Result<Option<CachedAnswer>> {
        let key = cache_key(request)?;
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(answer) => {
                debug!(key = %key, "response cache hit");
                Ok(Some(answer))
            }
            Err(e) => {
                warn!(key = %key, error = %e, "corrupt cache entry, treating as miss");
                Ok(None)
            }
        }
    }

    /// Store a finished answer for `request`.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails.
    pub async fn put(&self, request: &ChatRequest, answer: &CachedAnswer) -> Result<()> {
        let key = cache_key(request)?;
        let raw = serde_json::to_string(answer)?;
        self.kv
            .set_with_ttl(&key, &raw, Duration::from_secs(self.ttl_secs))
            .await?;
        Ok(())
    }
}

/// Digest a request into its cache key.
fn cache_key(request: &ChatRequest) -> Result<String> {
    let canonical = serde_json::to_string(request)?;
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(format!("parley:llm:{digest:x}"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::kv::MemoryKv;
    use parley_core::ChatMessage;

    fn request(text: &str) -> ChatRequest {
        ChatRequest {
            model: "gpt-4-turbo".to_string(),
            messages: vec![ChatMessage::user(text)],
            temperature: 0.2,
            max_tokens: 512,
        }
    }

    fn cache() -> ResponseCache {
        ResponseCache::new(Arc::new(MemoryKv::new()), 60)
    }

    #[tokio::test]
    async fn round_trip() {
        let cache = cache();
        let req = request("how do refunds work?");
        assert!(cache.get(&req).await.unwrap().is_none());

        let answer = CachedAnswer {
            text: "Refunds take 5 business days.".to_string(),
        };
        cache.put(&req, &answer).await.unwrap();
        assert_eq!(cache.get(&req).await.unwrap(), Some(answer));
    }

    #[tokio::test]
    async fn different_requests_get_different_keys() {
        let a = cache_key(&request("question one")).unwrap();
        let b = cache_key(&request("question two")).unwrap();
        assert_ne!(a, b);

        let mut req = request("question one");
        req.temperature = 0.9;
        assert_ne!(a, cache_key(&req).unwrap());
    }

    #[tokio::test]
    async fn identical_requests_share_a_key() {
        assert_eq!(
            cache_key(&request("same")).unwrap(),
            cache_key(&request("same")).unwrap()
        );
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_miss() {
        let kv = Arc::new(MemoryKv::new());
        let cache = ResponseCache::new(Arc::clone(&kv) as Arc<dyn KvStore>, 60);
        let req = request("hello");
        let key = cache_key(&req).unwrap();
        kv.set_with_ttl(&key, "{not json", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.get(&req).await.unwrap().is_none());
    }
}
