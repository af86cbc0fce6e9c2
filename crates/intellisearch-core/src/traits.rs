//! Collaborator seams the retrieval pipeline is written against.

use async_trait::async_trait;

use crate::error::{EmbeddingError, IndexError, WebError};
use crate::types::{Document, EmbeddedDocument, SearchHit, WebSearchHit};

/// Turns text into fixed-length vectors. CPU/GPU bound, so callers on an
/// async runtime should run it on the blocking pool.
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier for the model (e.g. `bge-m3:d1024`).
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Read side of a nearest-neighbour index.
///
/// Scores are cosine similarity on L2-normalized vectors, clamped to
/// `[0, 1]`, returned in descending order. An empty index returns no hits.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn len(&self) -> Result<usize, IndexError>;
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>, IndexError>;
    async fn document(&self, id: &str) -> Result<Option<Document>, IndexError>;

    async fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len().await? == 0)
    }
}

/// Write side of an index. Implementations serialize writers and publish the
/// new contents atomically with respect to concurrent readers.
#[async_trait]
pub trait IndexWriter: Send + Sync {
    async fn replace_all(&self, documents: Vec<EmbeddedDocument>) -> Result<(), IndexError>;
}

#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// Engine name recorded on every result (e.g. "tavily").
    fn name(&self) -> &str;
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchHit>, WebError>;
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch a page and return its cleaned main text.
    async fn fetch(&self, url: &str) -> Result<String, WebError>;
}
