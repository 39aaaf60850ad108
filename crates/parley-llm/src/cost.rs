//! Rolling 24-hour cost ledger.
//!
//! Spend is accumulated in hourly buckets in the shared key-value store,
//! as integer micro-dollars so concurrent increments are exact. A bucket
//! lives slightly longer than the window so the sum never reads an
//! expired-but-needed hour.

use std::sync::Arc;
use std::time::Duration;

use parley_core::kv::KvStore;
use tracing::debug;

use crate::errors::Result;

/// Hours summed by the rolling window.
const WINDOW_HOURS: i64 = 24;

/// Bucket TTL (window plus one hour of slack).
const BUCKET_TTL: Duration = Duration::from_secs((WINDOW_HOURS as u64 + 1) * 3600);

/// Tracks generation spend over a rolling 24-hour window.
pub struct CostLedger {
    kv: Arc<dyn KvStore>,
    limit_usd: f64,
}

impl CostLedger {
    /// Create a ledger over the shared store with a dollar ceiling.
    pub fn new(kv: Arc<dyn KvStore>, limit_usd: f64) -> Self {
        Self { kv, limit_usd }
    }

    /// The configured ceiling in USD.
    #[must_use]
    pub fn limit_usd(&self) -> f64 {
        self.limit_usd
    }

    /// Record spend against the current hour's bucket.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails.
    pub async fn record(&self, cost_usd: f64) -> Result<()> {
        self.record_at(current_hour(), cost_usd).await
    }

    /// Total spend over the last 24 hours, in USD.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails.
    pub async fn spent_last_24h(&self) -> Result<f64> {
        self.spent_from(current_hour()).await
    }

    /// Whether the window total has reached the ceiling.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails.
    pub async fn is_exhausted(&self) -> Result<bool> {
        Ok(self.spent_last_24h().await? >= self.limit_usd)
    }

    async fn record_at(&self, hour: i64, cost_usd: f64) -> Result<()> {
        let micros = to_micros(cost_usd);
        if micros == 0 {
            return Ok(());
        }
        let total = self
            .kv
            .incr_with_ttl(&bucket_key(hour), micros, BUCKET_TTL)
            .await?;
        debug!(hour, added_usd = cost_usd, bucket_usd = from_micros(total), "recorded spend");
        Ok(())
    }

    async fn spent_from(&self, hour: i64) -> Result<f64> {
        let mut total_micros: i64 = 0;
        for offset in 0..WINDOW_HOURS {
            if let Some(value) = self.kv.get(&bucket_key(hour - offset)).await? {
                total_micros = total_micros.saturating_add(value.parse::<i64>().unwrap_or(0));
            }
        }
        Ok(from_micros(total_micros))
    }
}

fn bucket_key(hour: i64) -> String {
    format!("parley:cost:{hour}")
}

fn current_hour() -> i64 {
    chrono::Utc::now().timestamp() / 3600
}

#[allow(clippy::cast_possible_truncation)] // bounded by the daily limit, far below i64::MAX
fn to_micros(usd: f64) -> i64 {
    (usd * 1_000_000.0).round() as i64
}

#[allow(clippy::cast_precision_loss)]
fn from_micros(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
