//! Retrieval error types.
//!
//! Retrieval errors are non-fatal upstream — the orchestrator degrades to
//! a bare generation pass when search fails.

use thiserror::Error;

/// Errors from retrieval operations.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// HTTP request to the embeddings API failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The embeddings API returned a non-success status.
    #[error("embeddings API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or error description.
        message: String,
    },

    /// The embeddings API response had an unexpected shape.
    #[error("malformed embeddings response: {0}")]
    MalformedResponse(String),

    /// The document store failed.
    #[error("document store error: {0}")]
    Store(String),
}

/// Result alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        let err = RetrievalError::Api {
            status: 429,
            message: "rate limited".into(),
        };
        assert_eq!(
            err.to_string(),
            "embeddings API error (status 429): rate limited"
        );
        let err = RetrievalError::Store("index offline".into());
        assert_eq!(err.to_string(), "document store error: index offline");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RetrievalError>();
    }
}
