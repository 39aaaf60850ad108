//! OpenAI-compatible streaming chat completions client.
//!
//! Speaks the `/chat/completions` endpoint with `stream: true` and
//! `stream_options.include_usage` so the final chunk carries token
//! counts. Tool-call fragments are re-emitted as they arrive and merged
//! by positional index for the terminal event.

use std::collections::BTreeMap;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::{debug, instrument};

use crate::errors::GenerationError;
use crate::events::{GenerationEvent, TokenUsage, ToolCallRecord};
use crate::provider::{ChatProvider, ChatRequest, GenerationStream};
use crate::sse::{parse_sse_data, parse_sse_lines};

/// HTTP client for an OpenAI-compatible chat completions API.
pub struct OpenAiChatProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

#[derive(Deserialize)]
struct ToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
}

impl OpenAiChatProvider {
    /// Create a client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        request_timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiChatProvider {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn stream(&self, request: ChatRequest) -> Result<GenerationStream, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": true,
            "stream_options": {"include_usage": true},
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let lines = parse_sse_lines(Box::pin(response.bytes_stream()));
        let events = stream! {
            futures::pin_mut!(lines);

            let mut usage = TokenUsage::default();
            let mut finish_reason: Option<String> = None;
            // Fragments keyed by positional index; BTreeMap keeps the
            // terminal list in index order.
            let mut calls: BTreeMap<u32, ToolCallRecord> = BTreeMap::new();

            while let Some(item) = lines.next().await {
                let data = match item {
                    Ok(data) => data,
                    // A dropped connection must not look like a finished
                    // answer; surface it and stop.
                    Err(e) => {
                        yield Err(GenerationError::Http(e));
                        return;
                    }
                };
                let Some(chunk) = parse_sse_data::<StreamChunk>(&data) else {
                    continue;
                };

                if let Some(err) = chunk.error {
                    yield Err(GenerationError::Stream(err.message));
                    return;
                }

                if let Some(wire) = chunk.usage {
                    usage = TokenUsage {
                        input_tokens: wire.prompt_tokens,
                        output_tokens: wire.completion_tokens,
                    };
                }

                for choice in chunk.choices {
                    if let Some(reason) = choice.finish_reason {
                        finish_reason = Some(reason);
                    }
                    if let Some(content) = choice.delta.content {
                        if !content.is_empty() {
                            yield Ok(GenerationEvent::Text { text: content });
                        }
                    }
                    for delta in choice.delta.tool_calls {
                        let (name, arguments) = match delta.function {
                            Some(f) => (f.name, f.arguments.unwrap_or_default()),
                            None => (None, String::new()),
                        };

                        let record = calls.entry(delta.index).or_default();
                        if let Some(id) = &delta.id {
                            record.id.clone_from(id);
                        }
                        if let Some(name) = &name {
                            record.name.clone_from(name);
                        }
                        record.arguments.push_str(&arguments);

                        yield Ok(GenerationEvent::ToolCall {
                            index: delta.index,
                            id: delta.id,
                            name,
                            arguments,
                        });
                    }
                }
            }

            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                finish_reason = ?finish_reason,
                "completion stream finished"
            );
            yield Ok(GenerationEvent::End {
                usage,
                tool_calls: calls.into_values().collect(),
                finish_reason,
            });
        };

        Ok(Box::pin(events))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
