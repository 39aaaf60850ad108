//! Streaming generation events.
//!
//! A generation is a stream of events: zero or more `text` and
//! `tool_call` fragments, closed by exactly one terminal `end` or
//! `error`. Nothing follows a terminal event.

use serde::{Deserialize, Serialize};

/// Token counts reported by the upstream API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens consumed.
    pub input_tokens: u64,
    /// Completion tokens produced.
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Total tokens across prompt and completion.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// A fully assembled tool call, merged from its streamed fragments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Provider-assigned call identifier.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// JSON arguments, concatenated from fragments.
    pub arguments: String,
}

/// One event in a generation stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// A fragment of answer text.
    Text {
        /// The text delta.
        text: String,
    },
    /// A fragment of a tool call. Fragments with the same `index` belong
    /// to the same call and are merged positionally.
    ToolCall {
        /// Position of the call within the response.
        index: u32,
        /// Call identifier; only present on the first fragment.
        id: Option<String>,
        /// Tool name; only present on the first fragment.
        name: Option<String>,
        /// Argument JSON delta, possibly empty.
        arguments: String,
    },
    /// Terminal success event.
    End {
        /// Token usage for the whole generation.
        usage: TokenUsage,
        /// Tool calls merged from their fragments, in index order.
        tool_calls: Vec<ToolCallRecord>,
        /// Upstream finish reason, when reported.
        finish_reason: Option<String>,
    },
    /// Terminal failure event.
    Error {
        /// Human-readable description.
        message: String,
    },
}

impl GenerationEvent {
    /// Whether this event closes the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End { .. } | Self::Error { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_snake_case_tags() {
        let event = GenerationEvent::Text {
            text: "hi".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "text");

        let event = GenerationEvent::ToolCall {
            index: 0,
            id: Some("call_1".to_string()),
            name: Some("lookup_order".to_string()),
            arguments: "{\"order".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["index"], 0);

        let event = GenerationEvent::End {
            usage: TokenUsage::default(),
            tool_calls: Vec::new(),
            finish_reason: Some("stop".to_string()),
        };
        assert_eq!(serde_json::to_value(&event).unwrap()["type"], "end");

        let event = GenerationEvent::Error {
            message: "upstream timeout".to_string(),
        };
        assert_eq!(serde_json::to_value(&event).unwrap()["type"], "error");
    }

    #[test]
    fn terminal_detection() {
        assert!(GenerationEvent::End {
            usage: TokenUsage::default(),
            tool_calls: Vec::new(),
            finish_reason: None,
        }
        .is_terminal());
        assert!(GenerationEvent::Error {
            message: String::new()
        }
        .is_terminal());
        assert!(!GenerationEvent::Text {
            text: String::new()
        }
        .is_terminal());
    }

    #[test]
    fn usage_total() {
        let usage = TokenUsage {
            input_tokens: 120,
            output_tokens: 80,
        };
        assert_eq!(usage.total(), 200);
    }
}
