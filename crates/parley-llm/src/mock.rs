//! Scripted chat provider for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::GenerationError;
use crate::events::{GenerationEvent, TokenUsage};
use crate::provider::{ChatProvider, ChatRequest, GenerationStream};

/// A [`ChatProvider`] that replays scripted event sequences.
///
/// Each call to [`ChatProvider::stream`] pops the next script; when no
/// script remains it yields an empty completion. Received requests are
/// recorded for assertions.
#[derive(Default)]
pub struct MockChatProvider {
    scripts: Mutex<VecDeque<Vec<Result<GenerationEvent, GenerationError>>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatProvider {
    /// Create a provider with no scripts queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a script of events for the next call.
    pub fn push_script(&self, script: Vec<Result<GenerationEvent, GenerationError>>) {
        self.scripts.lock().push_back(script);
    }

    /// Queue a plain text completion with the given usage.
    pub fn push_text(&self, text: &str, usage: TokenUsage) {
        self.push_script(vec![
            Ok(GenerationEvent::Text {
                text: text.to_string(),
            }),
            Ok(GenerationEvent::End {
                usage,
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            }),
        ]);
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn stream(&self, request: ChatRequest) -> Result<GenerationStream, GenerationError> {
        self.requests.lock().push(request);
        let script = self.scripts.lock().pop_front().unwrap_or_else(|| {
            vec![Ok(GenerationEvent::End {
                usage: TokenUsage::default(),
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            })]
        });
        Ok(Box::pin(futures::stream::iter(script)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt as _;
    use parley_core::ChatMessage;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-4-turbo".to_string(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.2,
            max_tokens: 64,
        }
    }

    #[tokio::test]
    async fn replays_scripts_in_order() {
        let provider = MockChatProvider::new();
        provider.push_text("first", TokenUsage::default());
        provider.push_text("second", TokenUsage::default());

        for expected in ["first", "second"] {
            let events: Vec<_> = provider
                .stream(request())
                .await
                .unwrap()
                .map(Result::unwrap)
                .collect()
                .await;
            assert_eq!(
                events[0],
                GenerationEvent::Text {
                    text: expected.to_string()
                }
            );
        }
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn empty_queue_yields_bare_end() {
        let provider = MockChatProvider::new();
        let events: Vec<_> = provider
            .stream(request())
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
    }
}
