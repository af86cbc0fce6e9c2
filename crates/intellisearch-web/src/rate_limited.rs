//! Rate-limited search provider.
//!
//! Wraps any [`WebSearchProvider`] so that outgoing searches respect a
//! `governor` quota shared across all callers of the wrapper.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};

use intellisearch_core::traits::WebSearchProvider;
use intellisearch_core::{WebError, WebSearchHit};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct RateLimitedSearchProvider {
    inner: Arc<dyn WebSearchProvider>,
    limiter: Arc<DefaultRateLimiter>,
}

impl RateLimitedSearchProvider {
    /// At most `requests_per_second` searches per second, bursting up to the same count.
    pub fn new(inner: Arc<dyn WebSearchProvider>, requests_per_second: NonZeroU32) -> Self {
        Self::with_quota(inner, Quota::per_second(requests_per_second))
    }

    pub fn with_quota(inner: Arc<dyn WebSearchProvider>, quota: Quota) -> Self {
        Self { inner, limiter: Arc::new(RateLimiter::direct(quota)) }
    }
}

#[async_trait]
impl WebSearchProvider for RateLimitedSearchProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchHit>, WebError> {
        self.limiter.until_ready().await;
        self.inner.search(query, max_results).await
    }
}
