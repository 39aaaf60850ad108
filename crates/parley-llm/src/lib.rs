//! # parley-llm
//!
//! Streaming answer generation. The [`GenerationService`] wraps an
//! OpenAI-compatible chat provider with a response cache, a rolling
//! 24-hour cost ledger, and a circuit breaker, and emits a stream of
//! [`GenerationEvent`]s closed by exactly one terminal event.

#![deny(unsafe_code)]

pub mod breaker;
pub mod cache;
pub mod cost;
pub mod errors;
pub mod events;
pub mod mock;
pub mod openai;
pub mod pricing;
pub mod provider;
pub mod service;
pub mod sse;
pub mod usage;

pub use breaker::CircuitBreaker;
pub use cache::{CachedAnswer, ResponseCache};
pub use cost::CostLedger;
pub use errors::{GenerationError, Result};
pub use events::{GenerationEvent, TokenUsage, ToolCallRecord};
pub use openai::OpenAiChatProvider;
pub use pricing::{calculate_cost, pricing_tier, PricingTier};
pub use provider::{ChatProvider, ChatRequest, GenerationStream};
pub use service::GenerationService;
pub use usage::{NoopUsageSink, RuntimeUsageSink, UsageRecord, UsageSink};
