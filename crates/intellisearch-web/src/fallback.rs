use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use intellisearch_core::traits::{ContentFetcher, WebSearchProvider};
use intellisearch_core::{WebError, WebResult, WebSearchHit};

/// Pages fetched per query at most; the rest keep their snippet.
pub const MAX_EXTRACTIONS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebFallbackOutcome {
    pub results: Vec<WebResult>,
    pub has_results: bool,
}

impl WebFallbackOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_results(results: Vec<WebResult>) -> Self {
        let has_results = !results.is_empty();
        Self { results, has_results }
    }
}

/// Web search used when the local index has no good match.
///
/// Never fails: provider errors and timeouts are logged and produce an empty
/// outcome, extraction errors leave the snippet in place.
pub struct WebFallbackRetriever {
    provider: Arc<dyn WebSearchProvider>,
    fetcher: Option<Arc<dyn ContentFetcher>>,
    timeout: Duration,
}

impl WebFallbackRetriever {
    pub fn new(provider: Arc<dyn WebSearchProvider>, timeout: Duration) -> Self {
        Self { provider, fetcher: None, timeout }
    }

    pub fn with_fetcher(mut self, fetcher: Option<Arc<dyn ContentFetcher>>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn has_fetcher(&self) -> bool {
        self.fetcher.is_some()
    }

    pub async fn retrieve(&self, query: &str, max_results: usize, extract_content: bool) -> WebFallbackOutcome {
        if max_results == 0 {
            return WebFallbackOutcome::empty();
        }
        let engine = self.provider.name().to_string();
        let limit = max_results.saturating_mul(2);

        let hits = match timeout(self.timeout, self.provider.search(query, limit)).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                tracing::warn!(engine = %engine, error = %e, "web search failed");
                return WebFallbackOutcome::empty();
            }
            Err(_) => {
                let e = WebError::Timeout { target: engine.clone(), after: self.timeout };
                tracing::warn!(engine = %engine, error = %e, "web search timed out");
                return WebFallbackOutcome::empty();
            }
        };

        let mut results: Vec<WebResult> = dedup_by_url(hits)
            .into_iter()
            .take(max_results)
            .map(|hit| WebResult::from_hit(hit, &engine))
            .collect();

        if extract_content {
            if let Some(fetcher) = &self.fetcher {
                self.extract(fetcher.as_ref(), &mut results).await;
            }
        }

        tracing::debug!(engine = %engine, results = results.len(), "web fallback finished");
        WebFallbackOutcome::from_results(results)
    }

    async fn extract(&self, fetcher: &dyn ContentFetcher, results: &mut [WebResult]) {
        let n = results.len().min(MAX_EXTRACTIONS);
        let limit = self.timeout;
        let fetches = results[..n].iter().map(move |r| {
            let url = r.url.clone();
            async move {
                match timeout(limit, fetcher.fetch(&url)).await {
                    Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
                    Ok(Ok(_)) => None,
                    Ok(Err(e)) => {
                        tracing::warn!(url = %url, error = %e, "content extraction failed");
                        None
                    }
                    Err(_) => {
                        tracing::warn!(url = %url, after = ?limit, "content extraction timed out");
                        None
                    }
                }
            }
        });
        let texts = join_all(fetches).await;
        for (result, text) in results.iter_mut().zip(texts) {
            result.extracted_content = text;
        }
    }
}

/// Drops hits without a url and keeps the first (highest-ranked) hit per
/// trimmed url.
pub fn dedup_by_url(hits: Vec<WebSearchHit>) -> Vec<WebSearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter_map(|mut hit| {
            let url = hit.url.trim();
            if url.is_empty() || !seen.insert(url.to_string()) {
                return None;
            }
            hit.url = url.to_string();
            Some(hit)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_and_drops_blank_urls() {
        let hits = vec![
            WebSearchHit::new("A", "https://a.example", "first"),
            WebSearchHit::new("blank", "  ", "x"),
            WebSearchHit::new("A again", " https://a.example ", "second"),
            WebSearchHit::new("B", "https://b.example", "b"),
        ];
        let out = dedup_by_url(hits);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].snippet, "first");
        assert_eq!(out[1].url, "https://b.example");
    }
}
