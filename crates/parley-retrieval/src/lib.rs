//! # parley-retrieval
//!
//! Hybrid document retrieval: embeds the query, pulls nearest-neighbor
//! and keyword candidates from the document store, and blends semantic
//! similarity with lexical term frequency into a single combined score.
//!
//! Traits at the seams ([`EmbeddingProvider`], [`DocumentStore`],
//! [`MetricsSink`]) keep the engine testable without a network.

#![deny(unsafe_code)]

pub mod embedding;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod store;

pub use embedding::{EmbeddingProvider, HttpEmbeddingProvider};
pub use engine::RetrievalEngine;
pub use errors::{Result, RetrievalError};
pub use metrics::{MetricsSink, NoopMetricsSink, RuntimeMetricsSink, SearchMetrics};
pub use store::{
    Candidate, Document, DocumentStatus, DocumentStore, KeywordHit, MemoryDocumentStore,
};
