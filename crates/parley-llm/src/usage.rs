//! Per-generation usage accounting.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::events::TokenUsage;

/// A record of one finished generation.
#[derive(Clone, Debug, PartialEq)]
pub struct UsageRecord {
    /// Model that served the request.
    pub model: String,
    /// Token counts.
    pub usage: TokenUsage,
    /// Cost in USD.
    pub cost_usd: f64,
    /// Wall-clock latency of the generation in milliseconds.
    pub latency_ms: u64,
    /// When the generation finished.
    pub at: DateTime<Utc>,
}

/// Receives one [`UsageRecord`] per finished generation.
pub trait UsageSink: Send + Sync {
    /// Record a finished generation.
    fn record(&self, record: &UsageRecord);
}

/// Sink that forwards to the `metrics` facade and tracing.
#[derive(Default)]
pub struct RuntimeUsageSink;

impl UsageSink for RuntimeUsageSink {
    fn record(&self, r: &UsageRecord) {
        metrics::counter!("llm_generations_total").increment(1);
        #[allow(clippy::cast_precision_loss)]
        {
            metrics::histogram!("llm_output_tokens").record(r.usage.output_tokens as f64);
        }
        metrics::histogram!("llm_cost_usd").record(r.cost_usd);
        info!(
            model = %r.model,
            input_tokens = r.usage.input_tokens,
            output_tokens = r.usage.output_tokens,
            cost_usd = r.cost_usd,
            latency_ms = r.latency_ms,
            "generation finished"
        );
    }
}

/// Sink that drops every record. Useful in tests.
#[derive(Default)]
pub struct NoopUsageSink;

impl UsageSink for NoopUsageSink {
    fn record(&self, _record: &UsageRecord) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CapturingSink(Mutex<Vec<UsageRecord>>);

    impl UsageSink for CapturingSink {
        fn record(&self, record: &UsageRecord) {
            self.0.lock().push(record.clone());
        }
    }

    #[test]
    fn capturing_sink_stores_records() {
        let sink = CapturingSink::default();
        sink.record(&UsageRecord {
            model: "gpt-4-turbo".to_string(),
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
            },
            cost_usd: 0.00025,
            latency_ms: 840,
            at: Utc::now(),
        });
        let records = sink.0.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].model, "gpt-4-turbo");
    }
}
