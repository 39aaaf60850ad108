//! Per-query retrieval metrics.

use chrono::{DateTime, Utc};
use tracing::debug;

/// A record of one retrieval pass, emitted after scoring completes.
///
/// One record is emitted per search, including zero-hit and
/// embedding-failure passes. `hit` is always `!scores.is_empty()`.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchMetrics {
    /// The (already redacted) query text.
    pub query: String,
    /// Number of documents returned.
    pub returned: usize,
    /// Fused scores of the returned documents, best first.
    pub scores: Vec<f64>,
    /// Whether at least one document cleared the threshold.
    pub hit: bool,
    /// End-to-end search latency in milliseconds.
    pub latency_ms: u64,
    /// When the search finished.
    pub at: DateTime<Utc>,
}

/// Receives one [`SearchMetrics`] record per search.
pub trait MetricsSink: Send + Sync {
    /// Record the outcome of one search.
    fn record(&self, metrics: &SearchMetrics);
}

/// Sink that forwards to the `metrics` facade and tracing.
#[derive(Default)]
pub struct RuntimeMetricsSink;

impl MetricsSink for RuntimeMetricsSink {
    fn record(&self, m: &SearchMetrics) {
        metrics::counter!("retrieval_searches_total").increment(1);
        if !m.hit {
            metrics::counter!("retrieval_misses_total").increment(1);
        }
        #[allow(clippy::cast_precision_loss)]
        {
            metrics::histogram!("retrieval_latency_ms").record(m.latency_ms as f64);
            metrics::histogram!("retrieval_returned_docs").record(m.returned as f64);
        }
        debug!(
            returned = m.returned,
            hit = m.hit,
            top_score = ?m.scores.first(),
            latency_ms = m.latency_ms,
            "retrieval search finished"
        );
    }
}

/// Sink that drops every record. Useful in tests.
#[derive(Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record(&self, _metrics: &SearchMetrics) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CapturingSink(Mutex<Vec<SearchMetrics>>);

    impl MetricsSink for CapturingSink {
        fn record(&self, metrics: &SearchMetrics) {
            self.0.lock().push(metrics.clone());
        }
    }

    #[test]
    fn capturing_sink_stores_records() {
        let sink = CapturingSink::default();
        sink.record(&SearchMetrics {
            query: "how do refunds work".to_string(),
            returned: 2,
            scores: vec![0.91, 0.84],
            hit: true,
            latency_ms: 3,
            at: Utc::now(),
        });
        let records = sink.0.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].returned, 2);
        assert_eq!(records[0].hit, !records[0].scores.is_empty());
    }

    #[test]
    fn noop_sink_accepts_records() {
        let sink = NoopMetricsSink;
        sink.record(&SearchMetrics {
            query: String::new(),
            returned: 0,
            scores: Vec::new(),
            hit: false,
            latency_ms: 0,
            at: Utc::now(),
        });
    }
}
