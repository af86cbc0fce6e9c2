use std::sync::Arc;

use intellisearch_core::traits::{EmbeddingProvider, VectorIndex};
use intellisearch_core::{Error, IndexError, LocalMatch, Result};

/// Thresholded local matches. `sufficient` is true iff at least one match
/// passed the threshold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalRetrieval {
    pub matches: Vec<LocalMatch>,
    pub sufficient: bool,
}

impl LocalRetrieval {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Highest included score, 0 when nothing matched.
    pub fn max_score(&self) -> f32 {
        self.matches.iter().map(|m| m.score).fold(0.0, f32::max)
    }
}

/// Embeds the query and filters nearest neighbours by similarity.
#[derive(Clone)]
pub struct LocalRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl LocalRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub async fn retrieve(&self, query: &str, top_k: usize, threshold: f32) -> Result<LocalRetrieval> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("query is empty".into()));
        }
        if top_k == 0 {
            return Err(Error::InvalidInput("top_k must be >= 1".into()));
        }
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidInput(format!("threshold must be within [0, 1], got {threshold}")));
        }

        if self.index.len().await? == 0 {
            tracing::debug!("local index is empty");
            return Ok(LocalRetrieval::empty());
        }

        let embedder = Arc::clone(&self.embedder);
        let text = query.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| Error::Operation(format!("embedding task failed: {e}")))??;

        let hits = self.index.search(&vector, top_k).await?;
        let candidates = hits.len();
        let mut matches = Vec::with_capacity(candidates);
        for hit in hits {
            if hit.score.is_nan() || hit.score < threshold {
                continue;
            }
            let document = self
                .index
                .document(&hit.id)
                .await?
                .ok_or_else(|| IndexError::MissingDocument(hit.id.clone()))?;
            matches.push(LocalMatch { document, score: hit.score, rank: 0 });
        }
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        for (i, m) in matches.iter_mut().enumerate() {
            m.rank = i + 1;
        }

        tracing::debug!(candidates, kept = matches.len(), threshold, "local search");
        let sufficient = !matches.is_empty();
        Ok(LocalRetrieval { matches, sufficient })
    }
}
