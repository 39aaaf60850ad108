//! Embedding providers.
//!
//! The engine only needs a query vector, so the trait is a single call.
//! The HTTP implementation speaks the OpenAI-compatible `/embeddings`
//! endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::{Result, RetrievalError};

/// Produces a dense vector for a piece of text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `text` into a dense vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// OpenAI-compatible embeddings API client.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl HttpEmbeddingProvider {
    /// Create a client for the given endpoint and model.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": text,
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
            return Err(RetrievalError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingsResponse = response.json().await?;
        let row = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::MalformedResponse("empty data array".to_string()))?;
        if row.embedding.is_empty() {
            return Err(RetrievalError::MalformedResponse(
                "empty embedding vector".to_string(),
            ));
        }
        debug!(dims = row.embedding.len(), "embedded query");
        Ok(row.embedding)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn embeds_via_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": [0.1, 0.2, 0.3]}]
            })))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(&server.uri(), "test-model", "key").unwrap();
        let vector = provider.embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(&server.uri(), "m", "key").unwrap();
        let err = provider.embed("hello").await.unwrap_err();
        assert_matches!(err, RetrievalError::Api { status: 500, .. });
    }

    #[tokio::test]
    async fn empty_data_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(&server.uri(), "m", "key").unwrap();
        let err = provider.embed("hello").await.unwrap_err();
        assert_matches!(err, RetrievalError::MalformedResponse(_));
    }
}
