//! Settings type definitions with compiled defaults.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object covering every subsystem.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParleySettings {
    /// Server network and session lifecycle settings.
    pub server: ServerSettings,
    /// Hybrid retrieval settings.
    pub retrieval: RetrievalSettings,
    /// Answer generation settings.
    pub generation: GenerationSettings,
    /// Rule matcher settings.
    pub rules: RulesSettings,
    /// Canned reply templates.
    pub templates: Templates,
}

impl ParleySettings {
    /// Validate cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidValue`] when a value is out of range.
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if !(0.0..=1.0).contains(&r.min_score) {
            return Err(SettingsError::InvalidValue(format!(
                "retrieval.minScore must be in [0, 1], got {}",
                r.min_score
            )));
        }
        if r.semantic_weight < 0.0 || r.lexical_weight < 0.0 {
            return Err(SettingsError::InvalidValue(
                "retrieval weights must be non-negative".to_string(),
            ));
        }
        if (r.semantic_weight + r.lexical_weight) <= f64::EPSILON {
            return Err(SettingsError::InvalidValue(
                "retrieval weights must not both be zero".to_string(),
            ));
        }
        if r.max_documents == 0 || r.top_k == 0 {
            return Err(SettingsError::InvalidValue(
                "retrieval.maxDocuments and retrieval.topK must be at least 1".to_string(),
            ));
        }
        let g = &self.generation;
        if !(0.0..=2.0).contains(&g.temperature) {
            return Err(SettingsError::InvalidValue(format!(
                "generation.temperature must be in [0, 2], got {}",
                g.temperature
            )));
        }
        if g.daily_cost_limit_usd < 0.0 {
            return Err(SettingsError::InvalidValue(
                "generation.dailyCostLimitUsd must be non-negative".to_string(),
            ));
        }
        if self.server.idle_warning_secs >= self.server.session_timeout_secs {
            return Err(SettingsError::InvalidValue(
                "server.idleWarningSecs must be less than server.sessionTimeoutSecs".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server network and session lifecycle settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// HTTP/WebSocket port.
    pub port: u16,
    /// WebSocket ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Seconds of inactivity before the idle warning is sent.
    pub idle_warning_secs: u64,
    /// Seconds of inactivity before the session is closed.
    pub session_timeout_secs: u64,
    /// How often the idle sweeper runs, in seconds.
    pub sweep_interval_secs: u64,
    /// Width of the duplicate-message suppression window, in seconds.
    pub dedup_window_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            heartbeat_interval_secs: 30,
            idle_warning_secs: 1500,
            session_timeout_secs: 1800,
            sweep_interval_secs: 60,
            dedup_window_secs: 300,
        }
    }
}

/// Hybrid retrieval settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalSettings {
    /// Base URL of the embeddings API.
    pub embedding_base_url: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Minimum combined score for a document to be returned.
    pub min_score: f64,
    /// Maximum number of documents returned per query.
    pub max_documents: usize,
    /// Weight of the semantic score in the combined score.
    pub semantic_weight: f64,
    /// Weight of the lexical score in the combined score.
    pub lexical_weight: f64,
    /// Candidate pool size fetched from the document store.
    pub top_k: usize,
    /// Divisor that normalizes raw lexical rank into [0, 1].
    pub lexical_rank_ceiling: f64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            embedding_base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            min_score: 0.7,
            max_documents: 5,
            semantic_weight: 0.7,
            lexical_weight: 0.3,
            top_k: 10,
            lexical_rank_ceiling: 10.0,
        }
    }
}

/// Answer generation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    /// Base URL of the chat completions API.
    pub base_url: String,
    /// Chat model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum completion tokens per request.
    pub max_tokens: u32,
    /// Rolling 24-hour spend ceiling in US dollars.
    pub daily_cost_limit_usd: f64,
    /// Whether the response cache is consulted and populated.
    pub cache_enabled: bool,
    /// Response cache entry lifetime in seconds.
    pub cache_ttl_secs: u64,
    /// Consecutive failures before the circuit breaker opens.
    pub breaker_failure_threshold: u32,
    /// Seconds the breaker stays open before probing again.
    pub breaker_recovery_secs: u64,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo".to_string(),
            temperature: 0.2,
            max_tokens: 512,
            daily_cost_limit_usd: 50.0,
            cache_enabled: true,
            cache_ttl_secs: 86_400,
            breaker_failure_threshold: 5,
            breaker_recovery_secs: 60,
            request_timeout_secs: 30,
        }
    }
}

/// Rule matcher settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesSettings {
    /// Path to a JSON rules file. When absent, no rules are loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<String>,
}

/// Canned reply templates used by the orchestrator and session manager.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Templates {
    /// Sent when retrieval found context but generation produced nothing.
    pub retrieval_fallback: String,
    /// Sent when there was no context and generation produced no text.
    pub generation_fallback: String,
    /// Sent when the pipeline hit an unrecoverable error.
    pub error_fallback: String,
    /// Sent to every connection as it joins.
    pub welcome: String,
    /// System prompt prepended to every generation request.
    pub system_prompt: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            retrieval_fallback: "I found some related articles but couldn't put together a \
                                 confident answer from them. The sources below may still help."
                .to_string(),
            generation_fallback: "I wasn't able to put together a useful answer this time. \
                                  Could you rephrase the question or add a little more detail?"
                .to_string(),
            error_fallback: "Sorry, something went wrong on our side while handling that. \
                             Please try again in a moment."
                .to_string(),
            welcome: "Hi! I'm the support assistant. How can I help you today?".to_string(),
            system_prompt: "You are a concise, friendly customer support assistant. Answer \
                            using the provided context when it is given, and say so when you \
                            do not know."
                .to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = ParleySettings::default();
        settings.validate().expect("defaults must validate");
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.retrieval.max_documents, 5);
        assert!((settings.retrieval.semantic_weight - 0.7).abs() < f64::EPSILON);
        assert_eq!(settings.generation.model, "gpt-4-turbo");
    }

    #[test]
    fn serde_round_trip_uses_camel_case() {
        let settings = ParleySettings::default();
        let json = serde_json::to_value(&settings).unwrap();
        assert!(json["server"]["sessionTimeoutSecs"].is_number());
        assert!(json["generation"]["dailyCostLimitUsd"].is_number());
        let back: ParleySettings = serde_json::from_value(json).unwrap();
        assert_eq!(back.server.session_timeout_secs, 1800);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let settings: ParleySettings =
            serde_json::from_str(r#"{"server": {"port": 9000}}"#).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.heartbeat_interval_secs, 30);
        assert_eq!(settings.generation.max_tokens, 512);
    }

    #[test]
    fn rejects_out_of_range_min_score() {
        let mut settings = ParleySettings::default();
        settings.retrieval.min_score = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_zero_weights() {
        let mut settings = ParleySettings::default();
        settings.retrieval.semantic_weight = 0.0;
        settings.retrieval.lexical_weight = 0.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_warning_after_timeout() {
        let mut settings = ParleySettings::default();
        settings.server.idle_warning_secs = 2000;
        assert!(settings.validate().is_err());
    }
}
