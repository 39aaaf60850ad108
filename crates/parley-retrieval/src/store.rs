//! Document storage.
//!
//! Stores own the document bodies and embedding vectors, and answer
//! nearest-neighbor and keyword queries over the published subset. The
//! in-memory implementation is a brute-force scan, which is plenty for a
//! knowledge base of a few thousand articles.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Publication state of a knowledge-base document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Visible to retrieval.
    #[default]
    Published,
    /// Being edited, never retrieved.
    Draft,
    /// Retired, never retrieved.
    Archived,
}

/// A knowledge-base document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Origin of the document (URL, product area, import batch).
    pub source: String,
    /// Full document text.
    pub body: String,
    /// Publication state.
    #[serde(default)]
    pub status: DocumentStatus,
}

/// A candidate returned by a nearest-neighbor query.
#[derive(Clone, Debug)]
pub struct Candidate {
    /// The matched document.
    pub document: Document,
    /// Cosine distance to the query vector, in `[0, 2]`.
    pub distance: f64,
}

/// A candidate returned by a keyword query.
#[derive(Clone, Debug)]
pub struct KeywordHit {
    /// The matched document.
    pub document: Document,
    /// Total occurrences of the query terms in title and body.
    pub occurrences: usize,
}

/// Answers nearest-neighbor and keyword queries over published documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return up to `top_k` published documents closest to `query`,
    /// ordered by ascending distance.
    async fn nearest(&self, query: &[f32], top_k: usize) -> Result<Vec<Candidate>>;

    /// Return up to `top_k` published documents containing at least one
    /// of `terms`, ordered by descending occurrence count.
    async fn keyword_rank(&self, terms: &[String], top_k: usize) -> Result<Vec<KeywordHit>>;
}

struct StoredDocument {
    document: Document,
    embedding: Vec<f32>,
}

/// In-memory brute-force document store.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<Vec<StoredDocument>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document with its embedding.
    pub fn insert(&self, document: Document, embedding: Vec<f32>) {
        self.documents.write().push(StoredDocument {
            document,
            embedding,
        });
    }

    /// Number of stored documents, regardless of status.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn nearest(&self, query: &[f32], top_k: usize) -> Result<Vec<Candidate>> {
        let documents = self.documents.read();
        let mut candidates: Vec<Candidate> = documents
            .iter()
            .filter(|stored| stored.document.status == DocumentStatus::Published)
            .map(|stored| Candidate {
                document: stored.document.clone(),
                distance: cosine_distance(query, &stored.embedding),
            })
            .collect();
        candidates.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(top_k);
        Ok(candidates)
    }

    async fn keyword_rank(&self, terms: &[String], top_k: usize) -> Result<Vec<KeywordHit>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let documents = self.documents.read();
        let mut hits: Vec<KeywordHit> = documents
            .iter()
            .filter(|stored| stored.document.status == DocumentStatus::Published)
            .filter_map(|stored| {
                let occurrences = term_occurrences(&stored.document, terms);
                (occurrences > 0).then(|| KeywordHit {
                    document: stored.document.clone(),
                    occurrences,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        hits.truncate(top_k);
        Ok(hits)
    }
}

/// Split text into lowercase alphanumeric terms.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Count how often any of `terms` occurs in the document title and body.
fn term_occurrences(document: &Document, terms: &[String]) -> usize {
    let haystack = format!("{} {}", document.title, document.body);
    tokenize(&haystack)
        .into_iter()
        .filter(|t| terms.contains(t))
        .count()
}

/// Cosine distance between two vectors, in `[0, 2]`.
///
/// Mismatched or zero-magnitude vectors get the maximum distance rather
/// than an error, so a single bad row cannot fail a whole query.
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 2.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 2.0;
    }
    let similarity = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    1.0 - similarity
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, status: DocumentStatus) -> Document {
        Document {
            id: id.to_string(),
            title: format!("Title {id}"),
            source: "kb".to_string(),
            body: "body text".to_string(),
            status,
        }
    }

    #[test]
    fn cosine_distance_identical_vectors_is_zero() {
        let d = cosine_distance(&[1.0, 0.0], &[1.0, 0.0]);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn cosine_distance_opposite_vectors_is_two() {
        let d = cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((d - 2.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_distance_orthogonal_vectors_is_one() {
        let d = cosine_distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((d - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mismatched_lengths_get_max_distance() {
        assert!((cosine_distance(&[1.0], &[1.0, 0.0]) - 2.0).abs() < 1e-9);
        assert!((cosine_distance(&[0.0, 0.0], &[1.0, 0.0]) - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn nearest_orders_by_distance() {
        let store = MemoryDocumentStore::new();
        store.insert(doc("far", DocumentStatus::Published), vec![0.0, 1.0]);
        store.insert(doc("close", DocumentStatus::Published), vec![1.0, 0.1]);
        let results = store.nearest(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, "close");
        assert!(results[0].distance < results[1].distance);
    }

    #[tokio::test]
    async fn nearest_skips_unpublished() {
        let store = MemoryDocumentStore::new();
        store.insert(doc("draft", DocumentStatus::Draft), vec![1.0, 0.0]);
        store.insert(doc("archived", DocumentStatus::Archived), vec![1.0, 0.0]);
        store.insert(doc("live", DocumentStatus::Published), vec![0.0, 1.0]);
        let results = store.nearest(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "live");
    }

    #[tokio::test]
    async fn nearest_truncates_to_top_k() {
        let store = MemoryDocumentStore::new();
        for i in 0..5 {
            store.insert(doc(&format!("d{i}"), DocumentStatus::Published), vec![
                1.0,
                i as f32 * 0.1,
            ]);
        }
        let results = store.nearest(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn empty_store_returns_empty() {
        let store = MemoryDocumentStore::new();
        assert!(store.is_empty());
        let results = store.nearest(&[1.0, 0.0], 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn tokenize_splits_and_lowercases() {
        assert_eq!(tokenize("Reset, my PASSWORD!"), vec![
            "reset", "my", "password"
        ]);
        assert!(tokenize("  ...  ").is_empty());
    }

    fn body_doc(id: &str, title: &str, body: &str) -> Document {
        Document {
            id: id.to_string(),
            title: title.to_string(),
            source: "kb".to_string(),
            body: body.to_string(),
            status: DocumentStatus::Published,
        }
    }

    #[tokio::test]
    async fn keyword_rank_orders_by_occurrences() {
        let store = MemoryDocumentStore::new();
        store.insert(
            body_doc("once", "Refunds", "A refund takes five days."),
            vec![1.0, 0.0],
        );
        store.insert(
            body_doc("twice", "Refund policy", "Request a refund from billing."),
            vec![1.0, 0.0],
        );
        store.insert(
            body_doc("never", "Shipping", "Delivery schedules by region."),
            vec![1.0, 0.0],
        );
        let terms = tokenize("refund");
        let hits = store.keyword_rank(&terms, 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.id, "twice");
        assert_eq!(hits[0].occurrences, 2);
        assert_eq!(hits[1].document.id, "once");
    }

    #[tokio::test]
    async fn keyword_rank_skips_unpublished() {
        let store = MemoryDocumentStore::new();
        store.insert(doc("draft", DocumentStatus::Draft), vec![1.0, 0.0]);
        store.insert(doc("live", DocumentStatus::Published), vec![1.0, 0.0]);
        let terms = tokenize("body text");
        let hits = store.keyword_rank(&terms, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.id, "live");
    }

    #[tokio::test]
    async fn keyword_rank_truncates_and_handles_empty_terms() {
        let store = MemoryDocumentStore::new();
        for i in 0..5 {
            store.insert(doc(&format!("d{i}"), DocumentStatus::Published), vec![
                1.0, 0.0,
            ]);
        }
        let terms = tokenize("body");
        assert_eq!(store.keyword_rank(&terms, 3).await.unwrap().len(), 3);
        assert!(store.keyword_rank(&[], 3).await.unwrap().is_empty());
    }
}
