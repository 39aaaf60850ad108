//! Chat provider abstraction.
//!
//! The generation service talks to the upstream through [`ChatProvider`],
//! which returns a boxed stream of [`GenerationEvent`]s. Tests swap in a
//! scripted provider; production uses the OpenAI-compatible HTTP client.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use parley_core::ChatMessage;

use crate::errors::GenerationError;
use crate::events::GenerationEvent;

/// Boxed stream of [`GenerationEvent`]s returned by [`ChatProvider::stream`].
pub type GenerationStream =
    Pin<Box<dyn Stream<Item = Result<GenerationEvent, GenerationError>> + Send>>;

/// A chat completion request.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages, system prompt first.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum completion tokens.
    pub max_tokens: u32,
}

/// Streams chat completions from an upstream model.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Start a streaming completion for `request`.
    ///
    /// The returned stream yields fragments and closes with exactly one
    /// terminal event. Transport failures before any event surface as
    /// `Err`.
    async fn stream(&self, request: ChatRequest) -> Result<GenerationStream, GenerationError>;
}
