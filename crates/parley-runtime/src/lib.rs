//! # parley-runtime
//!
//! Pipeline coordination. The [`Orchestrator`] sequences redaction, rule
//! matching, retrieval, and generation for one inbound message, applying
//! a fallback at every stage so the caller always gets an answer and
//! never an error.

#![deny(unsafe_code)]

pub mod context;
pub mod orchestrator;

pub use context::build_context;
pub use orchestrator::Orchestrator;
