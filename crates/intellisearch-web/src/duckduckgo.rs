//! DuckDuckGo instant-answer API client.
//!
//! The instant-answer endpoint is not a full web index: it returns an
//! abstract for well-known topics plus a tree of related topics. Both are
//! flattened into ranked hits.

use async_trait::async_trait;
use serde::Deserialize;

use intellisearch_core::traits::WebSearchProvider;
use intellisearch_core::{WebError, WebSearchHit};

const DDG_ENDPOINT: &str = "https://api.duckduckgo.com/";
const TITLE_CHARS: usize = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

/// Either a leaf topic or a named group of topics.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Leaf {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

fn flatten(topics: Vec<RelatedTopic>, out: &mut Vec<WebSearchHit>) {
    for topic in topics {
        match topic {
            RelatedTopic::Leaf { text, first_url } => {
                let title: String = text.chars().take(TITLE_CHARS).collect();
                out.push(WebSearchHit::new(title, first_url, text));
            }
            RelatedTopic::Group { topics } => flatten(topics, out),
        }
    }
}

/// Parse an instant-answer body: the abstract first (when present), then
/// related topics depth-first.
pub fn parse_instant_answer(body: &str) -> Result<Vec<WebSearchHit>, WebError> {
    let answer: InstantAnswer =
        serde_json::from_str(body).map_err(|e| WebError::Parse(format!("duckduckgo: {e}")))?;
    let mut hits = Vec::new();
    if !answer.abstract_text.trim().is_empty() && !answer.abstract_url.trim().is_empty() {
        let title = if answer.heading.is_empty() { answer.abstract_url.clone() } else { answer.heading };
        hits.push(WebSearchHit::new(title, answer.abstract_url, answer.abstract_text));
    }
    flatten(answer.related_topics, &mut hits);
    Ok(hits)
}

pub struct DuckDuckGoSearchProvider {
    client: reqwest::Client,
    endpoint: String,
    user_agent: String,
}

impl DuckDuckGoSearchProvider {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: DDG_ENDPOINT.to_string(), user_agent: user_agent.into() }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl WebSearchProvider for DuckDuckGoSearchProvider {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchHit>, WebError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("User-Agent", &self.user_agent)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_redirect", "1"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| WebError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WebError::Status { status: response.status().as_u16(), url: self.endpoint.clone() });
        }

        // served as application/x-javascript, so decode the text ourselves
        let body = response.text().await.map_err(|e| WebError::Http(e.to_string()))?;
        let mut hits = parse_instant_answer(&body)?;
        hits.truncate(max_results);
        tracing::debug!(query, hits = hits.len(), "duckduckgo search");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_nested_topics_after_abstract() {
        let body = r#"{
            "Heading": "Quantum computing",
            "AbstractText": "Quantum computing uses qubits.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Quantum_computing",
            "RelatedTopics": [
                {"Text": "Qubit - basic unit", "FirstURL": "https://duckduckgo.com/Qubit"},
                {"Name": "See also", "Topics": [
                    {"Text": "Superposition", "FirstURL": "https://duckduckgo.com/Superposition"}
                ]}
            ]
        }"#;
        let hits = parse_instant_answer(body).unwrap();
        let urls: Vec<_> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://en.wikipedia.org/wiki/Quantum_computing",
                "https://duckduckgo.com/Qubit",
                "https://duckduckgo.com/Superposition"
            ]
        );
        assert_eq!(hits[0].title, "Quantum computing");
        assert_eq!(hits[1].snippet, "Qubit - basic unit");
    }

    #[test]
    fn empty_answer_has_no_hits() {
        let hits = parse_instant_answer(r#"{"Heading": "", "AbstractText": "", "RelatedTopics": []}"#).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn long_text_titles_are_capped() {
        let text = "x".repeat(150);
        let body = format!(r#"{{"RelatedTopics": [{{"Text": "{text}", "FirstURL": "https://a.example"}}]}}"#);
        let hits = parse_instant_answer(&body).unwrap();
        assert_eq!(hits[0].title.chars().count(), 100);
        assert_eq!(hits[0].snippet.len(), 150);
    }
}
