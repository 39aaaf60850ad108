//! The generation service.
//!
//! Wraps the chat provider with the cost controls that keep the backend
//! safe to run unattended. A request passes three gates in order:
//!
//! 1. **Response cache** — identical requests within the TTL replay the
//!    finished answer at no cost.
//! 2. **Cost ledger** — once the rolling 24-hour spend reaches the
//!    ceiling, requests are refused until spend rolls out of the window.
//! 3. **Circuit breaker** — a run of consecutive upstream failures stops
//!    further calls until the recovery period elapses.
//!
//! Events from a live stream are forwarded as-is; accounting, breaker
//! bookkeeping, and cache population happen on the terminal event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_stream::stream;
use parley_core::kv::KvStore;
use parley_core::ChatMessage;
use parley_settings::GenerationSettings;
use tokio_stream::StreamExt;
use tracing::{instrument, warn};

use crate::breaker::CircuitBreaker;
use crate::cache::{CachedAnswer, ResponseCache};
use crate::cost::CostLedger;
use crate::errors::GenerationError;
use crate::events::{GenerationEvent, TokenUsage};
use crate::pricing::calculate_cost;
use crate::provider::{ChatProvider, ChatRequest, GenerationStream};
use crate::usage::{UsageRecord, UsageSink};

/// Streaming answer generation with caching, budgets, and a breaker.
pub struct GenerationService {
    provider: Arc<dyn ChatProvider>,
    cache: Arc<ResponseCache>,
    ledger: Arc<CostLedger>,
    breaker: Arc<CircuitBreaker>,
    sink: Arc<dyn UsageSink>,
    settings: GenerationSettings,
}

impl GenerationService {
    /// Assemble a service from its parts.
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        kv: Arc<dyn KvStore>,
        sink: Arc<dyn UsageSink>,
        settings: GenerationSettings,
    ) -> Self {
        let cache = Arc::new(ResponseCache::new(Arc::clone(&kv), settings.cache_ttl_secs));
        let ledger = Arc::new(CostLedger::new(kv, settings.daily_cost_limit_usd));
        let breaker = Arc::new(CircuitBreaker::new(
            settings.breaker_failure_threshold,
            Duration::from_secs(settings.breaker_recovery_secs),
        ));
        Self {
            provider,
            cache,
            ledger,
            breaker,
            sink,
            settings,
        }
    }

    /// Generate an answer for `messages`.
    ///
    /// The returned stream closes with exactly one terminal event.
    /// Upstream failures mid-stream surface as a terminal `error` event,
    /// never as a stream item error.
    ///
    /// # Errors
    ///
    /// Returns an error when a pre-flight gate refuses the request
    /// (budget exhausted, breaker open) or the upstream rejects it
    /// outright.
    #[instrument(skip_all, fields(model = %self.settings.model))]
    pub async fn generate(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<GenerationStream, GenerationError> {
        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        if self.settings.cache_enabled {
            if let Some(answer) = self.cache.get(&request).await? {
                return Ok(self.replay(answer));
            }
        }

        let spent = self.ledger.spent_last_24h().await?;
        if spent >= self.ledger.limit_usd() {
            return Err(GenerationError::BudgetExhausted {
                spent_usd: spent,
                limit_usd: self.ledger.limit_usd(),
            });
        }

        self.breaker.check()?;

        let upstream = match self.provider.stream(request.clone()).await {
            Ok(stream) => stream,
            Err(e) => {
                self.breaker.record_failure();
                return Err(e);
            }
        };

        let cache = Arc::clone(&self.cache);
        let ledger = Arc::clone(&self.ledger);
        let breaker = Arc::clone(&self.breaker);
        let sink = Arc::clone(&self.sink);
        let cache_enabled = self.settings.cache_enabled;

        let started = Instant::now();
        let events = stream! {
            futures::pin_mut!(upstream);
            let mut text = String::new();

            while let Some(item) = upstream.next().await {
                match item {
                    Ok(GenerationEvent::Text { text: delta }) => {
                        text.push_str(&delta);
                        yield Ok(GenerationEvent::Text { text: delta });
                    }
                    Ok(event @ GenerationEvent::ToolCall { .. }) => {
                        yield Ok(event);
                    }
                    Ok(GenerationEvent::End { usage, tool_calls, finish_reason }) => {
                        breaker.record_success();
                        let cost_usd = calculate_cost(&request.model, &usage);
                        if let Err(e) = ledger.record(cost_usd).await {
                            warn!(error = %e, "failed to record spend");
                        }
                        #[allow(clippy::cast_possible_truncation)]
                        let latency_ms = started.elapsed().as_millis() as u64;
                        sink.record(&UsageRecord {
                            model: request.model.clone(),
                            usage,
                            cost_usd,
                            latency_ms,
                            at: chrono::Utc::now(),
                        });
                        if cache_enabled && !text.is_empty() && tool_calls.is_empty() {
                            let answer = CachedAnswer {
                                text: std::mem::take(&mut text),
                            };
                            if let Err(e) = cache.put(&request, &answer).await {
                                warn!(error = %e, "failed to populate response cache");
                            }
                        }
                        yield Ok(GenerationEvent::End { usage, tool_calls, finish_reason });
                        return;
                    }
                    Ok(event @ GenerationEvent::Error { .. }) => {
                        breaker.record_failure();
                        yield Ok(event);
                        return;
                    }
                    Err(e) => {
                        breaker.record_failure();
                        yield Ok(GenerationEvent::Error { message: e.to_string() });
                        return;
                    }
                }
            }

            // The upstream closed without a terminal event.
            breaker.record_failure();
            yield Ok(GenerationEvent::Error {
                message: "completion stream ended unexpectedly".to_string(),
            });
        };

        Ok(Box::pin(events))
    }

    /// Replay a cached answer as a short event stream.
    ///
    /// No usage record is written for a replay — nothing was spent.
    fn replay(&self, answer: CachedAnswer) -> GenerationStream {
        metrics::counter!("llm_cache_hits_total").increment(1);

        let mut events = Vec::new();
        if !answer.text.is_empty() {
            events.push(Ok(GenerationEvent::Text { text: answer.text }));
        }
        events.push(Ok(GenerationEvent::End {
            usage: TokenUsage::default(),
            tool_calls: Vec::new(),
            finish_reason: Some("cached".to_string()),
        }));
        Box::pin(futures::stream::iter(events))
    }

    /// Whether the breaker is currently rejecting requests.
    #[must_use]
    pub fn breaker_open(&self) -> bool {
        self.breaker.is_open()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
