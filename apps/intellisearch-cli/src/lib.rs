//! Wiring shared by the `intellisearch-indexer` and `intellisearch-query`
//! binaries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intellisearch_core::config::{expand_path, AppConfig, IndexBackend};
use intellisearch_core::corpus::CorpusLoader;
use intellisearch_core::traits::{EmbeddingProvider, IndexWriter};
use intellisearch_core::Document;
use intellisearch_rag::Capabilities;
use intellisearch_vector::{open_index, BuildReport, IndexBuilder};

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Corpus location: the explicit argument, else `corpus.path` from config.
pub fn corpus_path(app: &AppConfig, explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(|| expand_path(&app.corpus.path), Path::to_path_buf)
}

pub fn load_corpus(path: &Path, limit: Option<usize>) -> Result<Vec<Document>> {
    let mut documents = CorpusLoader::new()
        .load(path)
        .with_context(|| format!("loading corpus from {}", path.display()))?;
    if let Some(limit) = limit {
        documents.truncate(limit);
    }
    Ok(documents)
}

pub async fn build_index(
    app: &AppConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    documents: Vec<Document>,
    writer: &dyn IndexWriter,
    progress: bool,
) -> Result<BuildReport> {
    let report = IndexBuilder::new(embedder)
        .batch_size(app.embedding.batch_size)
        .show_progress(progress)
        .build(documents, writer)
        .await
        .context("building vector index")?;
    Ok(report)
}

/// Nothing persists in a memory index between runs, so it is filled from the
/// configured corpus at startup. Returns false when the corpus cannot be
/// loaded or indexed; the caller then leaves the index out.
async fn populate_memory_index(
    app: &AppConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    writer: &dyn IndexWriter,
) -> bool {
    let path = corpus_path(app, None);
    let built = match load_corpus(&path, None) {
        Ok(documents) => build_index(app, embedder, documents, writer, false).await,
        Err(e) => Err(e),
    };
    match built {
        Ok(report) => {
            tracing::info!(indexed = report.indexed, corpus = %path.display(), "memory index built");
            true
        }
        Err(e) => {
            tracing::warn!(
                error = %format!("{e:#}"),
                corpus = %path.display(),
                "memory index not built, local search disabled"
            );
            false
        }
    }
}

/// Probe every collaborator once. Missing local pieces are logged and left
/// out; the orchestrator then answers from the web or not at all.
pub async fn capabilities(app: &AppConfig) -> Result<Capabilities> {
    let mut caps = Capabilities::new();

    let embedder = match intellisearch_embed::load_embedder(&app.embedding) {
        Ok(embedder) => Some(embedder),
        Err(e) => {
            tracing::warn!(error = %e, "embedding model unavailable, local search disabled");
            None
        }
    };

    match open_index(&app.index).await {
        Ok(handle) => {
            let usable = match (&embedder, app.index.backend) {
                (Some(embedder), IndexBackend::Memory) => {
                    populate_memory_index(app, Arc::clone(embedder), handle.writer.as_ref()).await
                }
                _ => true,
            };
            if usable {
                caps = caps.with_index(handle.reader);
            }
        }
        Err(e) => tracing::warn!(error = %e, "vector index unavailable, local search disabled"),
    }
    if let Some(embedder) = embedder {
        caps = caps.with_embedder(embedder);
    }

    if let Some(provider) = intellisearch_web::build_search_provider(&app.web)? {
        caps = caps.with_web_search(provider);
        match intellisearch_web::build_content_fetcher(&app.web, app.retrieval.web_timeout()) {
            Ok(fetcher) => caps = caps.with_content_fetcher(fetcher),
            Err(e) => tracing::warn!(error = %e, "content extraction disabled"),
        }
    }
    Ok(caps)
}
