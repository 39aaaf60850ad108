//! Generation error types.

use thiserror::Error;

/// Errors that can occur during answer generation.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The chat API returned a non-success status.
    #[error("chat API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or error description.
        message: String,
    },

    /// The circuit breaker is open; the upstream is considered down.
    #[error("circuit breaker open, retry after {retry_after_secs}s")]
    CircuitOpen {
        /// Seconds until the next probe is allowed.
        retry_after_secs: u64,
    },

    /// The rolling 24-hour spend ceiling has been reached.
    #[error("daily cost limit reached: spent ${spent_usd:.2} of ${limit_usd:.2}")]
    BudgetExhausted {
        /// Dollars spent over the rolling window.
        spent_usd: f64,
        /// Configured ceiling in dollars.
        limit_usd: f64,
    },

    /// The shared key-value store failed.
    #[error("kv store error: {0}")]
    Kv(#[from] parley_core::kv::KvError),

    /// The response stream ended abnormally.
    #[error("stream error: {0}")]
    Stream(String),
}

/// Result alias for generation operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        let err = GenerationError::CircuitOpen {
            retry_after_secs: 42,
        };
        assert_eq!(err.to_string(), "circuit breaker open, retry after 42s");

        let err = GenerationError::BudgetExhausted {
            spent_usd: 50.25,
            limit_usd: 50.0,
        };
        assert_eq!(
            err.to_string(),
            "daily cost limit reached: spent $50.25 of $50.00"
        );

        let err = GenerationError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "chat API error (status 503): overloaded");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GenerationError>();
    }
}
