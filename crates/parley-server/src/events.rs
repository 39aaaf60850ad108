//! Wire events exchanged with chat clients.
//!
//! Inbound payloads are JSON objects discriminated by `type`; unknown or
//! malformed payloads are answered with a generic `server.error` rather
//! than a closed connection.

use chrono::Utc;
use parley_core::{PipelineResult, Provenance, SourceRef};
use serde::{Deserialize, Serialize};

/// A payload sent by the client.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Heartbeat. Echoed back as `pong`; never reaches the pipeline.
    #[serde(rename = "ping")]
    Ping {
        /// Client timestamp, echoed back when present.
        #[serde(default)]
        timestamp: Option<i64>,
    },
    /// A user message for the pipeline.
    #[serde(rename = "client.message")]
    Message {
        /// Message text.
        text: String,
    },
}

/// A payload sent to the client.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// First event on every connection.
    #[serde(rename = "connection.established")]
    Welcome {
        /// Greeting text.
        message: String,
        /// Server timestamp, unix seconds.
        timestamp: i64,
    },
    /// Heartbeat reply.
    #[serde(rename = "pong")]
    Pong {
        /// Echo of the client timestamp, or the server's clock.
        timestamp: i64,
    },
    /// Typing indicator bracketing pipeline work.
    #[serde(rename = "server.typing")]
    Typing {
        /// Whether the assistant is composing.
        typing: bool,
    },
    /// A finished answer.
    #[serde(rename = "server.message")]
    Message {
        /// Answer text.
        text: String,
        /// Citations, empty unless the answer came from retrieval.
        sources: Vec<SourceRef>,
        /// Which pipeline stage produced the answer.
        provenance: Provenance,
        /// Server timestamp, unix seconds.
        timestamp: i64,
    },
    /// Generic failure notice; the connection stays open.
    #[serde(rename = "server.error")]
    Error {
        /// Human-readable description.
        message: String,
    },
    /// One-time notice that the session has been idle for a while.
    #[serde(rename = "server.idle_warning")]
    IdleWarning {
        /// Seconds the session has been idle.
        idle_secs: u64,
    },
    /// Final notice before the server closes an idle session.
    #[serde(rename = "server.timeout")]
    Timeout {
        /// Seconds the session was idle.
        idle_secs: u64,
    },
}

impl ServerEvent {
    /// Build a `server.message` from a pipeline result.
    #[must_use]
    pub fn from_result(result: PipelineResult) -> Self {
        Self::Message {
            text: result.answer,
            sources: result.sources,
            provenance: result.provenance,
            timestamp: Utc::now().timestamp(),
        }
    }

    /// Serialize to the wire string. Serialization of these types cannot
    /// fail in practice; a failure yields an empty error payload.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"server.error","message":"internal"}"#.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
