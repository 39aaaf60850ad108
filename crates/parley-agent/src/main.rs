//! # parley-agent
//!
//! Parley support-chat server binary — wires together all crates and
//! starts the HTTP/WebSocket server.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use parley_core::kv::{KvStore, MemoryKv};
use parley_llm::{GenerationService, OpenAiChatProvider, RuntimeUsageSink};
use parley_retrieval::{
    Document, EmbeddingProvider, HttpEmbeddingProvider, MemoryDocumentStore, RetrievalEngine,
    RuntimeMetricsSink,
};
use parley_rules::RuleMatcher;
use parley_runtime::Orchestrator;
use parley_server::{AppState, ConnectionRegistry, Deduplicator, build_router, spawn_idle_sweeper};
use parley_settings::ParleySettings;

/// Parley support-chat server.
#[derive(Parser, Debug)]
#[command(name = "parley-agent", about = "Parley support-chat server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the settings file.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Path to the canned-reply rules file (overrides settings).
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Path to a JSON array of help-center documents to index at startup.
    #[arg(long)]
    documents: Option<PathBuf>,
}

impl Cli {
    fn default_settings_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".parley").join("settings.json")
    }
}

/// Load and compile the rule list, if one is configured.
fn load_rules(cli: &Cli, settings: &ParleySettings) -> Result<RuleMatcher> {
    let path = cli
        .rules
        .clone()
        .or_else(|| settings.rules.rules_path.as_ref().map(PathBuf::from));
    let Some(path) = path else {
        info!("no rules file configured, rule matching disabled");
        return Ok(RuleMatcher::new(Vec::new()));
    };
    let rules = parley_rules::load_rules_from_path(&path)
        .with_context(|| format!("failed to load rules from {}", path.display()))?;
    info!(count = rules.len(), path = %path.display(), "rules loaded");
    Ok(RuleMatcher::new(rules))
}

/// Index the configured document corpus, embedding each body up front.
///
/// Documents whose embedding fails are skipped with a warning so one bad
/// document cannot block startup.
async fn index_documents(
    cli: &Cli,
    embedder: &HttpEmbeddingProvider,
    store: &MemoryDocumentStore,
) -> Result<()> {
    let Some(path) = &cli.documents else {
        info!("no document corpus configured, retrieval will return no hits");
        return Ok(());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read documents from {}", path.display()))?;
    let documents: Vec<Document> =
        serde_json::from_str(&content).context("documents file is not a JSON document array")?;

    let total = documents.len();
    let mut indexed = 0usize;
    for document in documents {
        match embedder.embed(&document.body).await {
            Ok(embedding) => {
                store.insert(document, embedding);
                indexed += 1;
            }
            Err(err) => {
                warn!(id = %document.id, error = %err, "skipping document that failed to embed");
            }
        }
    }
    info!(indexed, total, "document corpus indexed");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(Cli::default_settings_path);
    let mut settings = parley_settings::load_settings_from_path(&settings_path)
        .context("failed to load settings")?;
    if let Some(host) = &cli.host {
        settings.server.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        warn!("OPENAI_API_KEY is not set, embedding and generation calls will be rejected upstream");
    }

    let kv = Arc::new(MemoryKv::new());

    let rules = Arc::new(load_rules(&cli, &settings)?);

    let embedder = HttpEmbeddingProvider::new(
        &settings.retrieval.embedding_base_url,
        &settings.retrieval.embedding_model,
        &api_key,
    )
    .context("failed to build embedding client")?;
    let store = MemoryDocumentStore::new();
    index_documents(&cli, &embedder, &store).await?;
    let retrieval = Arc::new(RetrievalEngine::new(
        Arc::new(embedder),
        Arc::new(store),
        Arc::new(RuntimeMetricsSink),
        settings.retrieval.clone(),
    ));

    let provider = OpenAiChatProvider::new(
        &settings.generation.base_url,
        &api_key,
        Duration::from_secs(settings.generation.request_timeout_secs),
    )
    .context("failed to build chat client")?;
    let generation = Arc::new(GenerationService::new(
        Arc::new(provider),
        Arc::clone(&kv) as Arc<dyn KvStore>,
        Arc::new(RuntimeUsageSink),
        settings.generation.clone(),
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        rules,
        retrieval,
        generation,
        settings.templates.clone(),
    ));

    let registry = Arc::new(ConnectionRegistry::new());
    let sweeper = spawn_idle_sweeper(
        Arc::clone(&registry),
        Duration::from_secs(settings.server.sweep_interval_secs),
        Duration::from_secs(settings.server.idle_warning_secs),
        Duration::from_secs(settings.server.session_timeout_secs),
    );

    let dedup = Arc::new(Deduplicator::new(kv, settings.server.dedup_window_secs));

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = Arc::new(AppState {
        registry,
        orchestrator,
        dedup,
        settings,
        started_at: Instant::now(),
    });
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %listener.local_addr()?, "parley listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutting down");
    sweeper.abort();
    Ok(())
}

/// Resolve on ctrl-c.
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_rules(rules: Option<PathBuf>) -> Cli {
        Cli {
            host: None,
            port: None,
            settings: None,
            rules,
            documents: None,
        }
    }

    #[test]
    fn no_rules_file_yields_an_empty_matcher() {
        let cli = cli_with_rules(None);
        let matcher = load_rules(&cli, &ParleySettings::default()).unwrap();
        assert!(matcher.is_empty());
    }

    #[test]
    fn rules_load_from_the_cli_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"[{"name":"greet","pattern":"hello","reply":"Hi there!"}]"#,
        )
        .unwrap();
        let cli = cli_with_rules(Some(path));
        let matcher = load_rules(&cli, &ParleySettings::default()).unwrap();
        assert_eq!(matcher.len(), 1);
    }

    #[test]
    fn missing_rules_file_is_an_error() {
        let cli = cli_with_rules(Some(PathBuf::from("/nonexistent/rules.json")));
        assert!(load_rules(&cli, &ParleySettings::default()).is_err());
    }
}
