use std::fs;

use intellisearch_cli::capabilities;
use intellisearch_core::config::{
    AppConfig, CorpusConfig, EmbeddingBackend, EmbeddingConfig, IndexBackend, IndexConfig, WebConfig, WebProviderKind,
};

fn memory_config(corpus: &std::path::Path) -> AppConfig {
    let defaults = AppConfig::default();
    AppConfig {
        embedding: EmbeddingConfig { backend: EmbeddingBackend::Hashed, hashed_dim: 32, ..defaults.embedding },
        index: IndexConfig { backend: IndexBackend::Memory, ..defaults.index },
        web: WebConfig { provider: WebProviderKind::Disabled, ..defaults.web },
        corpus: CorpusConfig { path: corpus.to_string_lossy().into_owned() },
        ..defaults
    }
}

#[tokio::test]
async fn missing_corpus_leaves_memory_index_out() {
    let dir = tempfile::tempdir().unwrap();
    let app = memory_config(&dir.path().join("no-such-corpus"));

    let caps = capabilities(&app).await.unwrap();
    let summary = caps.summary();
    assert!(!summary.vector_index);
    assert!(summary.embedding_model);
    assert!(!summary.web_search);
}

#[tokio::test]
async fn readable_corpus_fills_memory_index() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    fs::create_dir_all(corpus.join("space")).unwrap();
    fs::write(corpus.join("space").join("mars.txt"), "Mars is the fourth planet from the Sun.").unwrap();
    let app = memory_config(&corpus);

    let caps = capabilities(&app).await.unwrap();
    assert!(caps.summary().vector_index);
}
