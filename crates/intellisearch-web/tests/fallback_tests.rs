use std::sync::Arc;
use std::time::Duration;

use intellisearch_core::WebSearchHit;
use intellisearch_web::testing::{FailingSearchProvider, StaticFetcher, StaticSearchProvider};
use intellisearch_web::WebFallbackRetriever;

const TIMEOUT: Duration = Duration::from_secs(5);

fn hit(n: usize, url: &str) -> WebSearchHit {
    WebSearchHit::new(format!("Result {n}"), url, format!("snippet {n}"))
}

#[tokio::test]
async fn dedup_then_cap_preserves_provider_order() {
    let provider = Arc::new(StaticSearchProvider::new(vec![
        hit(1, "https://a.example"),
        hit(2, "https://b.example"),
        hit(3, "https://a.example"),
        hit(4, "https://c.example"),
        hit(5, "https://d.example"),
    ]));
    let retriever = WebFallbackRetriever::new(provider.clone(), TIMEOUT);

    let outcome = retriever.retrieve("anything", 4, false).await;
    assert!(outcome.has_results);
    let urls: Vec<_> = outcome.results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, ["https://a.example", "https://b.example", "https://c.example", "https://d.example"]);
    assert_eq!(outcome.results[0].snippet, "snippet 1", "first occurrence wins");
    assert!(outcome.results.iter().all(|r| r.source_engine == "static"));
    assert_eq!(provider.last_limit(), 8, "provider asked for headroom");
}

#[tokio::test]
async fn cap_is_applied_after_dedup() {
    let provider = Arc::new(StaticSearchProvider::new(vec![
        hit(1, "https://a.example"),
        hit(2, "https://a.example"),
        hit(3, "https://b.example"),
    ]));
    let outcome = WebFallbackRetriever::new(provider, TIMEOUT).retrieve("q", 2, false).await;
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[1].url, "https://b.example");
}

#[tokio::test]
async fn zero_max_results_skips_provider() {
    let provider = Arc::new(StaticSearchProvider::new(vec![hit(1, "https://a.example")]));
    let outcome = WebFallbackRetriever::new(provider.clone(), TIMEOUT).retrieve("q", 0, true).await;
    assert!(!outcome.has_results);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn provider_failure_yields_empty_outcome() {
    let provider = Arc::new(FailingSearchProvider::new());
    let outcome = WebFallbackRetriever::new(provider.clone(), TIMEOUT).retrieve("q", 5, true).await;
    assert!(outcome.results.is_empty());
    assert!(!outcome.has_results);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn slow_provider_times_out_to_empty_outcome() {
    let provider =
        Arc::new(StaticSearchProvider::new(vec![hit(1, "https://a.example")]).with_delay(Duration::from_secs(2)));
    let outcome = WebFallbackRetriever::new(provider, Duration::from_millis(50)).retrieve("q", 5, false).await;
    assert!(!outcome.has_results);
}

#[tokio::test]
async fn only_urls_are_kept_and_empty_ones_dropped() {
    let provider = Arc::new(StaticSearchProvider::new(vec![hit(1, ""), hit(2, "https://b.example")]));
    let outcome = WebFallbackRetriever::new(provider, TIMEOUT).retrieve("q", 5, false).await;
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].title, "Result 2");
}

#[tokio::test]
async fn extraction_degrades_per_url() {
    let provider = Arc::new(StaticSearchProvider::new(vec![
        hit(1, "https://ok.example"),
        hit(2, "https://broken.example"),
        hit(3, "https://slow.example"),
        hit(4, "https://fourth.example"),
    ]));
    let fetcher = Arc::new(
        StaticFetcher::new()
            .page("https://ok.example", "Full article text.")
            .failing("https://broken.example")
            .slow("https://slow.example", Duration::from_secs(2), "too late")
            .page("https://fourth.example", "never fetched"),
    );
    let retriever = WebFallbackRetriever::new(provider, Duration::from_millis(200)).with_fetcher(Some(fetcher.clone()));

    let outcome = retriever.retrieve("q", 4, true).await;
    assert_eq!(outcome.results.len(), 4);
    assert_eq!(outcome.results[0].extracted_content.as_deref(), Some("Full article text."));
    assert_eq!(outcome.results[1].extracted_content, None);
    assert_eq!(outcome.results[2].extracted_content, None);
    assert_eq!(outcome.results[3].extracted_content, None);
    assert_eq!(outcome.results[1].best_text(), "snippet 2");

    let mut fetched = fetcher.fetched();
    fetched.sort();
    assert_eq!(fetched, ["https://broken.example", "https://ok.example", "https://slow.example"]);
}

#[tokio::test]
async fn extraction_disabled_leaves_snippets() {
    let provider = Arc::new(StaticSearchProvider::new(vec![hit(1, "https://ok.example")]));
    let fetcher = Arc::new(StaticFetcher::new().page("https://ok.example", "page"));
    let retriever = WebFallbackRetriever::new(provider, TIMEOUT).with_fetcher(Some(fetcher.clone()));

    let outcome = retriever.retrieve("q", 3, false).await;
    assert_eq!(outcome.results[0].extracted_content, None);
    assert!(fetcher.fetched().is_empty());
}
