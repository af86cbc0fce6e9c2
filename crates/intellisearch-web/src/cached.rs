//! Search result cache keyed on the trimmed query and requested count.
//! Entries expire after a fixed time-to-live; failed searches are never stored.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;

use intellisearch_core::traits::WebSearchProvider;
use intellisearch_core::{WebError, WebSearchHit};

type SearchKey = (String, usize);

pub struct CachedSearchProvider {
    inner: Arc<dyn WebSearchProvider>,
    cache: Cache<SearchKey, Vec<WebSearchHit>>,
}

impl CachedSearchProvider {
    pub fn new(inner: Arc<dyn WebSearchProvider>, capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(capacity).time_to_live(ttl).build();
        Self { inner, cache }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

#[async_trait]
impl WebSearchProvider for CachedSearchProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchHit>, WebError> {
        let key = (query.trim().to_string(), max_results);
        if let Some(hits) = self.cache.get(&key) {
            tracing::debug!(query, "web search served from cache");
            return Ok(hits);
        }
        let hits = self.inner.search(query, max_results).await?;
        self.cache.insert(key, hits.clone());
        Ok(hits)
    }
}
