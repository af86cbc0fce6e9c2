use std::sync::Arc;

use serde::{Deserialize, Serialize};

use intellisearch_core::traits::{ContentFetcher, EmbeddingProvider, VectorIndex, WebSearchProvider};

/// Collaborators available to the orchestrator, decided once at startup.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub index: Option<Arc<dyn VectorIndex>>,
    pub web_search: Option<Arc<dyn WebSearchProvider>>,
    pub content_fetcher: Option<Arc<dyn ContentFetcher>>,
}

/// Which capabilities are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub embedding_model: bool,
    pub vector_index: bool,
    pub web_search: bool,
    pub content_fetcher: bool,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_web_search(mut self, provider: Arc<dyn WebSearchProvider>) -> Self {
        self.web_search = Some(provider);
        self
    }

    pub fn with_content_fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.content_fetcher = Some(fetcher);
        self
    }

    pub fn summary(&self) -> CapabilitySet {
        CapabilitySet {
            embedding_model: self.embedder.is_some(),
            vector_index: self.index.is_some(),
            web_search: self.web_search.is_some(),
            content_fetcher: self.content_fetcher.is_some(),
        }
    }
}
