//! Core message and result types flowing through the pipeline.
//!
//! An [`InboundMessage`] enters via the session layer, the orchestrator
//! produces exactly one [`PipelineResult`] per accepted message, and the
//! session layer delivers it back over the originating connection. None of
//! these types are persisted by the core — persistence is an external
//! collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message accepted from a client connection. Immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Raw message text as received (pre-redaction).
    pub text: String,
    /// Identity of the delivery channel (e.g. `"widget"`, `"telegram"`).
    pub channel: String,
    /// Conversation key — the room this message belongs to.
    pub conversation_key: String,
    /// Optional reference to an uploaded media object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// When the session layer accepted the message.
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Build an inbound message stamped with the current time.
    pub fn new(
        text: impl Into<String>,
        channel: impl Into<String>,
        conversation_key: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            channel: channel.into(),
            conversation_key: conversation_key.into(),
            media: None,
            received_at: Utc::now(),
        }
    }
}

/// Role of a chat turn sent to the generative model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instruction turn.
    System,
    /// End-user turn.
    User,
    /// Model turn.
    Assistant,
}

/// One chat turn in a generation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Turn role.
    pub role: ChatRole,
    /// Turn content.
    pub content: String,
}

impl ChatMessage {
    /// System turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A document surfaced by the hybrid retrieval engine for one query.
///
/// Transient — produced per query and never persisted as an entity (only
/// aggregate metrics are recorded).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Store-assigned document id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Source locator (URL or path).
    pub source: String,
    /// Content snippet handed to the generation prompt.
    pub snippet: String,
    /// Fused relevance score in `[0, 1]`.
    pub score: f64,
}

/// Which pipeline stage produced the final answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// A rule matched with sufficient confidence.
    Rule,
    /// Retrieval hit and the answer was generated with context.
    Retrieval,
    /// No retrieval hit; the bare-prompt generation answered.
    GenerationFallback,
    /// Every stage failed; a fixed apology was delivered.
    ErrorFallback,
}

/// A citation attached to a delivered answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Document title.
    pub title: String,
    /// Source locator.
    pub source: String,
    /// Fused score at retrieval time.
    pub score: f64,
}

impl From<&RetrievedDocument> for SourceRef {
    fn from(doc: &RetrievedDocument) -> Self {
        Self {
            title: doc.title.clone(),
            source: doc.source.clone(),
            score: doc.score,
        }
    }
}

/// The orchestrator's terminal output for one inbound message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Answer text delivered to the client.
    pub answer: String,
    /// Citations (empty for rule and fallback answers).
    pub sources: Vec<SourceRef>,
    /// Which stage produced the answer.
    pub provenance: Provenance,
}

impl PipelineResult {
    /// Result with no sources.
    pub fn bare(answer: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
            provenance,
        }
    }
}
