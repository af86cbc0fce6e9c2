//! Tavily search API client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use intellisearch_core::traits::WebSearchProvider;
use intellisearch_core::{WebError, WebSearchHit};

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

pub struct TavilySearchProvider {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    search_depth: String,
}

impl TavilySearchProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: SecretString::from(api_key.into()),
            endpoint: TAVILY_ENDPOINT.to_string(),
            search_depth: "basic".to_string(),
        }
    }

    /// Set search depth ("basic" or "advanced").
    pub fn with_search_depth(mut self, depth: impl Into<String>) -> Self {
        self.search_depth = depth.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Parse a Tavily response body, preserving the API's ranking.
pub fn parse_tavily_response(body: &str) -> Result<Vec<WebSearchHit>, WebError> {
    let response: TavilyResponse =
        serde_json::from_str(body).map_err(|e| WebError::Parse(format!("tavily: {e}")))?;
    Ok(response
        .results
        .into_iter()
        .map(|r| WebSearchHit::new(r.title, r.url, r.content))
        .collect())
}

#[async_trait]
impl WebSearchProvider for TavilySearchProvider {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchHit>, WebError> {
        let request = TavilyRequest { query, search_depth: &self.search_depth, max_results };
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .json(&request)
            .send()
            .await
            .map_err(|e| WebError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WebError::Status { status: response.status().as_u16(), url: self.endpoint.clone() });
        }

        let body = response.text().await.map_err(|e| WebError::Http(e.to_string()))?;
        let mut hits = parse_tavily_response(&body)?;
        hits.truncate(max_results);
        tracing::debug!(query, hits = hits.len(), "tavily search");
        Ok(hits)
    }
}
