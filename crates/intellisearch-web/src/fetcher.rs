use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use intellisearch_core::config::WebConfig;
use intellisearch_core::traits::ContentFetcher;
use intellisearch_core::WebError;

use crate::html::{html_to_text, truncate_at_sentence};

/// Fetches pages over HTTP and reduces them to their main text.
pub struct HttpContentFetcher {
    client: reqwest::Client,
    user_agent: String,
    skip_domains: Vec<String>,
    max_chars: usize,
}

impl HttpContentFetcher {
    pub fn new(config: &WebConfig, timeout: Duration) -> Result<Self, WebError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WebError::Http(e.to_string()))?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            skip_domains: config.skip_domains.iter().map(|d| d.to_lowercase()).collect(),
            max_chars: config.max_content_chars,
        })
    }

    /// Only absolute http(s) urls outside the skip list are fetched.
    pub fn check_url(&self, raw: &str) -> Result<Url, WebError> {
        let url = Url::parse(raw).map_err(|e| WebError::Blocked(format!("{raw}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(WebError::Blocked(format!("{raw}: unsupported scheme")));
        }
        let host = url.host_str().map(str::to_lowercase).unwrap_or_default();
        if host.is_empty() {
            return Err(WebError::Blocked(format!("{raw}: no host")));
        }
        if self.skip_domains.iter().any(|d| host == *d || host.ends_with(&format!(".{d}"))) {
            return Err(WebError::Blocked(format!("{raw}: skipped domain")));
        }
        Ok(url)
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &str) -> Result<String, WebError> {
        let target = self.check_url(url)?;
        let response = self
            .client
            .get(target)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| WebError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WebError::Status { status: response.status().as_u16(), url: url.to_string() });
        }

        let html = response.text().await.map_err(|e| WebError::Http(e.to_string()))?;
        let text = truncate_at_sentence(&html_to_text(&html), self.max_chars);
        tracing::debug!(url, chars = text.chars().count(), "extracted page text");
        Ok(text)
    }
}
