//! Web collaborators: search providers, page fetching, and the fallback
//! retriever that turns them into deduplicated, optionally enriched results.

mod cached;
mod duckduckgo;
mod fallback;
mod fetcher;
pub mod html;
mod rate_limited;
mod tavily;
pub mod testing;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use intellisearch_core::config::{WebConfig, WebProviderKind};
use intellisearch_core::traits::{ContentFetcher, WebSearchProvider};
use intellisearch_core::{Error, Result};

pub use cached::CachedSearchProvider;
pub use duckduckgo::{parse_instant_answer, DuckDuckGoSearchProvider};
pub use fallback::{dedup_by_url, WebFallbackOutcome, WebFallbackRetriever, MAX_EXTRACTIONS};
pub use fetcher::HttpContentFetcher;
pub use rate_limited::RateLimitedSearchProvider;
pub use tavily::{parse_tavily_response, TavilySearchProvider};

/// Build the configured search provider; `None` when web search is disabled.
///
/// The engine is rate limited per `web.requests_per_second`, and successful
/// answers are cached for `web.cache_ttl_secs` unless that is 0.
pub fn build_search_provider(config: &WebConfig) -> Result<Option<Arc<dyn WebSearchProvider>>> {
    let engine: Arc<dyn WebSearchProvider> = match config.provider {
        WebProviderKind::Disabled => return Ok(None),
        WebProviderKind::Duckduckgo => Arc::new(DuckDuckGoSearchProvider::new(config.user_agent.clone())),
        WebProviderKind::Tavily => {
            let key = config
                .tavily_api_key
                .clone()
                .ok_or_else(|| Error::InvalidConfig("web.tavily_api_key is not set".into()))?;
            Arc::new(TavilySearchProvider::new(key))
        }
    };
    let rate = NonZeroU32::new(config.requests_per_second)
        .ok_or_else(|| Error::InvalidConfig("web.requests_per_second must be >= 1".into()))?;
    let mut provider: Arc<dyn WebSearchProvider> = Arc::new(RateLimitedSearchProvider::new(engine, rate));
    if config.cache_ttl_secs > 0 && config.cache_capacity > 0 {
        provider = Arc::new(CachedSearchProvider::new(
            provider,
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        ));
    }
    tracing::info!(
        engine = provider.name(),
        requests_per_second = config.requests_per_second,
        cache_ttl_secs = config.cache_ttl_secs,
        "web search enabled"
    );
    Ok(Some(provider))
}

pub fn build_content_fetcher(config: &WebConfig, timeout: Duration) -> Result<Arc<dyn ContentFetcher>> {
    Ok(Arc::new(HttpContentFetcher::new(config, timeout)?))
}
