//! In-process test doubles for the web collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use intellisearch_core::traits::{ContentFetcher, WebSearchProvider};
use intellisearch_core::{WebError, WebSearchHit};

/// Returns a fixed hit list (up to `max_results`) and records each call.
pub struct StaticSearchProvider {
    hits: Vec<WebSearchHit>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_limit: AtomicUsize,
}

impl StaticSearchProvider {
    pub fn new(hits: Vec<WebSearchHit>) -> Self {
        Self { hits, delay: None, calls: AtomicUsize::new(0), last_limit: AtomicUsize::new(0) }
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_limit(&self) -> usize {
        self.last_limit.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearchProvider for StaticSearchProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<WebSearchHit>, WebError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(max_results, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}

/// Always fails with an HTTP error.
pub struct FailingSearchProvider {
    calls: AtomicUsize,
}

impl Default for FailingSearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FailingSearchProvider {
    pub fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearchProvider for FailingSearchProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<WebSearchHit>, WebError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(WebError::Http("connection refused".into()))
    }
}

enum Page {
    Text(String),
    Fail,
    Slow(Duration, String),
}

/// Serves canned page text per url; unknown urls answer 404.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, Page>,
    fetched: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Text(text.to_string()));
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Fail);
        self
    }

    pub fn slow(mut self, url: &str, delay: Duration, text: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Slow(delay, text.to_string()));
        self
    }

    /// Urls requested so far, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl ContentFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, WebError> {
        self.fetched.lock().unwrap_or_else(PoisonError::into_inner).push(url.to_string());
        match self.pages.get(url) {
            Some(Page::Text(text)) => Ok(text.clone()),
            Some(Page::Slow(delay, text)) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
            Some(Page::Fail) => Err(WebError::Http("connection reset".into())),
            None => Err(WebError::Status { status: 404, url: url.to_string() }),
        }
    }
}
