//! # parley-core
//!
//! Foundation types and utilities shared by every Parley crate:
//!
//! - **Messages**: [`InboundMessage`], chat-turn types, [`PipelineResult`]
//!   with its provenance tag
//! - **Documents**: [`RetrievedDocument`] produced per retrieval query
//! - **Key-value store**: the [`kv::KvStore`] trait backing the cost
//!   ledger, dedup store, and response cache, plus an in-memory TTL
//!   implementation for tests and single-node deployments
//! - **Redaction**: ordered PII pattern scrubbing applied before any text
//!   leaves the session boundary
//! - **Text**: UTF-8–safe truncation helpers

#![deny(unsafe_code)]

pub mod kv;
pub mod message;
pub mod redact;
pub mod text;

pub use message::{
    ChatMessage, ChatRole, InboundMessage, PipelineResult, Provenance, RetrievedDocument,
    SourceRef,
};
