//! Hybrid retrieval engine.
//!
//! A search embeds the query and pulls two candidate pools from the
//! document store: the nearest neighbors by cosine distance and the top
//! documents by query-term occurrence. The pools are fused over their
//! union, each candidate scored with a weighted blend; a candidate
//! missing from one pool contributes zero on that side:
//!
//! - semantic score: `1 - distance / 2`, mapping cosine distance into `[0, 1]`
//! - lexical score: query-term occurrence count, divided by a fixed
//!   ceiling and clamped to `[0, 1]`
//! - combined: `semantic_weight * semantic + lexical_weight * lexical`
//!
//! Candidates below the minimum combined score are dropped; at most
//! `max_documents` survive, best first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parley_core::text::truncate_with_suffix;
use parley_core::RetrievedDocument;
use parley_settings::RetrievalSettings;
use tracing::{instrument, warn};

use crate::embedding::EmbeddingProvider;
use crate::errors::Result;
use crate::metrics::{MetricsSink, SearchMetrics};
use crate::store::{Document, DocumentStore, tokenize};

/// Maximum snippet length carried into answers, in bytes.
const SNIPPET_CHARS: usize = 240;

/// Hybrid semantic + lexical search over a document store.
pub struct RetrievalEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn DocumentStore>,
    sink: Arc<dyn MetricsSink>,
    settings: RetrievalSettings,
}

struct ScoredCandidate {
    document: Document,
    semantic: f64,
    lexical: f64,
    combined: f64,
}

impl RetrievalEngine {
    /// Assemble an engine from its parts.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn DocumentStore>,
        sink: Arc<dyn MetricsSink>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            sink,
            settings,
        }
    }

    /// Search for documents relevant to `query`.
    ///
    /// Returns at most `max_documents` results whose combined score meets
    /// the minimum, best first. An empty result is a normal outcome, not
    /// an error; an embedding failure short-circuits to an empty result
    /// since the system degrades to uncontextualized generation anyway.
    ///
    /// # Errors
    ///
    /// Returns an error when scanning the store fails.
    #[instrument(skip_all, fields(query_chars = query.chars().count()))]
    pub async fn search(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        let started = Instant::now();
        let embedding = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "query embedding failed, returning no documents");
                self.emit_metrics(query, &[], started);
                return Ok(Vec::new());
            }
        };
        let query_terms = tokenize(query);
        let semantic_pool = self
            .store
            .nearest(&embedding, self.settings.top_k)
            .await?;
        let keyword_pool = self
            .store
            .keyword_rank(&query_terms, self.settings.top_k)
            .await?;

        // Fuse over the union of both pools, keyed by document id.
        let mut fused: HashMap<String, ScoredCandidate> = HashMap::new();
        for candidate in semantic_pool {
            let _ = fused.insert(candidate.document.id.clone(), ScoredCandidate {
                semantic: 1.0 - candidate.distance / 2.0,
                document: candidate.document,
                lexical: 0.0,
                combined: 0.0,
            });
        }
        for hit in keyword_pool {
            #[allow(clippy::cast_precision_loss)]
            let lexical =
                (hit.occurrences as f64 / self.settings.lexical_rank_ceiling).clamp(0.0, 1.0);
            fused
                .entry(hit.document.id.clone())
                .or_insert_with(|| ScoredCandidate {
                    document: hit.document,
                    semantic: 0.0,
                    lexical: 0.0,
                    combined: 0.0,
                })
                .lexical = lexical;
        }

        let mut scored: Vec<ScoredCandidate> = fused
            .into_values()
            .map(|mut s| {
                s.combined = self.settings.semantic_weight * s.semantic
                    + self.settings.lexical_weight * s.lexical;
                s
            })
            .filter(|s| s.combined >= self.settings.min_score)
            .collect();

        // Ties on combined score fall back to semantic, then lexical.
        scored.sort_by(|a, b| {
            b.combined
                .partial_cmp(&a.combined)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.semantic
                        .partial_cmp(&a.semantic)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| {
                    b.lexical
                        .partial_cmp(&a.lexical)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });
        scored.truncate(self.settings.max_documents);

        let results: Vec<RetrievedDocument> = scored
            .into_iter()
            .map(|s| RetrievedDocument {
                id: s.document.id,
                title: s.document.title,
                source: s.document.source,
                snippet: truncate_with_suffix(&s.document.body, SNIPPET_CHARS, "…"),
                score: s.combined,
            })
            .collect();

        self.emit_metrics(query, &results, started);
        Ok(results)
    }

    #[allow(clippy::cast_possible_truncation)] // latency never approaches u64 millis
    fn emit_metrics(&self, query: &str, results: &[RetrievedDocument], started: Instant) {
        let scores: Vec<f64> = results.iter().map(|d| d.score).collect();
        self.sink.record(&SearchMetrics {
            query: query.to_string(),
            returned: results.len(),
            hit: !scores.is_empty(),
            scores,
            latency_ms: started.elapsed().as_millis() as u64,
            at: chrono::Utc::now(),
        });
    }

}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
