//! The orchestrator: one pass per inbound message.
//!
//! Stage order: redact → rules → retrieval + generation → fallbacks.
//! Every stage failure is independently recoverable — a rule-matcher
//! problem falls through to retrieval, a retrieval failure falls through
//! to bare generation, and only total failure produces the apology. The
//! pipeline returns a [`PipelineResult`] in every case; it has no error
//! path.

use std::sync::Arc;

use parley_core::redact::redact_text;
use parley_core::{ChatMessage, PipelineResult, Provenance, RetrievedDocument, SourceRef};
use parley_llm::{GenerationEvent, GenerationService, GenerationStream};
use parley_retrieval::RetrievalEngine;
use parley_rules::{RuleAction, RuleMatcher};
use parley_settings::Templates;
use tokio_stream::StreamExt;
use tracing::{info, instrument, warn};

use crate::context::build_context;

/// Minimum rule confidence the pipeline accepts. Regex matches (0.95)
/// clear it; substring fallbacks (0.85) do not.
const RULE_ACCEPT_CONFIDENCE: f64 = 0.90;

/// Sequences the pipeline stages for one message at a time.
pub struct Orchestrator {
    rules: Arc<RuleMatcher>,
    retrieval: Arc<RetrievalEngine>,
    generation: Arc<GenerationService>,
    templates: Templates,
}

/// Outcome of draining one generation stream.
enum Drained {
    /// The stream closed with `end` and this much text.
    Finished(String),
    /// The stream closed with a terminal `error`.
    Failed(String),
}

impl Orchestrator {
    /// Assemble an orchestrator from its stage services.
    pub fn new(
        rules: Arc<RuleMatcher>,
        retrieval: Arc<RetrievalEngine>,
        generation: Arc<GenerationService>,
        templates: Templates,
    ) -> Self {
        Self {
            rules,
            retrieval,
            generation,
            templates,
        }
    }

    /// Process one inbound message into an answer.
    ///
    /// Never returns an error; every failure degrades to a fallback
    /// answer with the matching provenance tag.
    #[instrument(skip_all)]
    pub async fn process(&self, text: &str) -> PipelineResult {
        let redacted = redact_text(text);

        if let Some(m) = self.rules.match_text(&redacted) {
            if m.confidence < RULE_ACCEPT_CONFIDENCE {
                info!(
                    rule = %m.rule_name,
                    confidence = m.confidence,
                    "rule matched below acceptance confidence, continuing"
                );
            } else if m.action == RuleAction::Rag {
                info!(rule = %m.rule_name, "rule forces the retrieval path");
            } else {
                info!(
                    rule = %m.rule_name,
                    confidence = m.confidence,
                    action = ?m.action,
                    "rule answered"
                );
                metrics::counter!("pipeline_results_total", "provenance" => "rule").increment(1);
                return PipelineResult::bare(m.reply, Provenance::Rule);
            }
        }

        let documents = match self.retrieval.search(&redacted).await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(error = %e, "retrieval failed, degrading to bare generation");
                Vec::new()
            }
        };

        let result = if documents.is_empty() {
            self.answer_bare(&redacted).await
        } else {
            self.answer_with_context(&redacted, &documents).await
        };
        metrics::counter!(
            "pipeline_results_total",
            "provenance" => provenance_label(result.provenance)
        )
        .increment(1);
        result
    }

    /// Generation with retrieved context. The terminal state is always
    /// `retrieval`: a generation problem here substitutes the fallback
    /// text but keeps the sources.
    async fn answer_with_context(
        &self,
        redacted: &str,
        documents: &[RetrievedDocument],
    ) -> PipelineResult {
        let sources: Vec<SourceRef> = documents.iter().map(SourceRef::from).collect();
        let system = format!(
            "{}\n\nContext:\n{}",
            self.templates.system_prompt,
            build_context(documents)
        );
        let messages = vec![ChatMessage::system(system), ChatMessage::user(redacted)];

        let answer = match self.generation.generate(messages).await {
            Ok(stream) => match drain(stream).await {
                Drained::Finished(text) if !text.is_empty() => text,
                Drained::Finished(_) => {
                    warn!("generation produced no text despite context");
                    self.templates.retrieval_fallback.clone()
                }
                Drained::Failed(message) => {
                    warn!(error = %message, "generation failed with context");
                    self.templates.retrieval_fallback.clone()
                }
            },
            Err(e) => {
                warn!(error = %e, "generation refused with context");
                self.templates.retrieval_fallback.clone()
            }
        };

        PipelineResult {
            answer,
            sources,
            provenance: Provenance::Retrieval,
        }
    }

    /// Bare-prompt generation when retrieval found nothing. An empty
    /// answer degrades to `generation_fallback`; a generation error is
    /// total failure and degrades to the apology.
    async fn answer_bare(&self, redacted: &str) -> PipelineResult {
        let messages = vec![
            ChatMessage::system(self.templates.system_prompt.clone()),
            ChatMessage::user(redacted),
        ];

        match self.generation.generate(messages).await {
            Ok(stream) => match drain(stream).await {
                Drained::Finished(text) if !text.is_empty() => {
                    PipelineResult::bare(text, Provenance::GenerationFallback)
                }
                Drained::Finished(_) => PipelineResult::bare(
                    self.templates.generation_fallback.clone(),
                    Provenance::GenerationFallback,
                ),
                Drained::Failed(message) => {
                    warn!(error = %message, "bare generation failed");
                    PipelineResult::bare(
                        self.templates.error_fallback.clone(),
                        Provenance::ErrorFallback,
                    )
                }
            },
            Err(e) => {
                warn!(error = %e, "bare generation refused");
                PipelineResult::bare(
                    self.templates.error_fallback.clone(),
                    Provenance::ErrorFallback,
                )
            }
        }
    }
}

fn provenance_label(provenance: Provenance) -> &'static str {
    match provenance {
        Provenance::Rule => "rule",
        Provenance::Retrieval => "retrieval",
        Provenance::GenerationFallback => "generation_fallback",
        Provenance::ErrorFallback => "error_fallback",
    }
}

/// Drain a generation stream, concatenating text until the terminal
/// event. Tool-call fragments are ignored here; the support pipeline has
/// no tool executor.
async fn drain(mut stream: GenerationStream) -> Drained {
    let mut text = String::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(GenerationEvent::Text { text: delta }) => text.push_str(&delta),
            Ok(GenerationEvent::End { .. }) => return Drained::Finished(text),
            Ok(GenerationEvent::Error { message }) => return Drained::Failed(message),
            Ok(GenerationEvent::ToolCall { .. }) => {}
            Err(e) => return Drained::Failed(e.to_string()),
        }
    }
    // No terminal event; treat what arrived as the whole answer.
    Drained::Finished(text)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
