//! Domain types shared by the retrievers, the composer and the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::IndexError;

pub type DocumentId = String;

/// An immutable corpus entry.
///
/// - `id`: stable identifier, unique within an index
/// - `category`: free-form topical label (e.g. "planetary_science")
/// - `keywords`: ordered topical keywords, folded into the embedding text
/// - `source_label`: human-readable provenance shown in citations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub source_label: String,
}

impl Document {
    /// Text handed to the embedding provider at index-build time.
    pub fn embedding_text(&self) -> String {
        if self.keywords.is_empty() {
            format!("{}. {}", self.title, self.content)
        } else {
            format!("{}. {}. Keywords: {}", self.title, self.content, self.keywords.join(" "))
        }
    }

    pub fn is_embeddable(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// A document paired with the vector produced for it at index-build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedDocument {
    pub document: Document,
    pub vector: Vec<f32>,
}

impl EmbeddedDocument {
    pub fn new(document: Document, vector: Vec<f32>) -> Result<Self, IndexError> {
        if !document.is_embeddable() {
            return Err(IndexError::EmptyDocument(document.id));
        }
        if vector.is_empty() {
            return Err(IndexError::DimensionMismatch { expected: 1, actual: 0 });
        }
        Ok(Self { document, vector })
    }

    pub fn dim(&self) -> usize {
        self.vector.len()
    }
}

/// Raw nearest-neighbour result. `score` is cosine similarity in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocumentId,
    pub score: f32,
}

/// A local document that passed the similarity threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalMatch {
    pub document: Document,
    pub score: f32,
    /// 1-based position after filtering.
    pub rank: usize,
}

/// One ranked entry as returned by a web search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl WebSearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into(), snippet: snippet.into() }
    }
}

/// A deduplicated web result, optionally enriched with extracted page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub extracted_content: Option<String>,
    pub source_engine: String,
}

impl WebResult {
    pub fn from_hit(hit: WebSearchHit, source_engine: &str) -> Self {
        Self {
            title: hit.title,
            url: hit.url,
            snippet: hit.snippet,
            extracted_content: None,
            source_engine: source_engine.to_string(),
        }
    }

    /// Extracted page text when available, otherwise the search snippet.
    pub fn best_text(&self) -> &str {
        match self.extracted_content.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => &self.snippet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    LocalOnly,
    WebFallback,
    None,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::LocalOnly => "LOCAL_ONLY",
            Strategy::WebFallback => "WEB_FALLBACK",
            Strategy::None => "NONE",
        };
        f.write_str(s)
    }
}

/// Stage of the per-query state machine, reported in pipeline errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryStage {
    Init,
    LocalSearch,
    EscalateWeb,
    Compose,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryStage::Init => "init",
            QueryStage::LocalSearch => "local search",
            QueryStage::EscalateWeb => "web escalation",
            QueryStage::Compose => "context composition",
        };
        f.write_str(s)
    }
}

/// A citable source, labelled the same way the composed context labels it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub label: String,
    pub title: String,
    /// Source label for local documents, url for web results.
    pub locator: String,
}

/// The orchestrator's per-query decision record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub query: String,
    pub strategy: Strategy,
    pub local_matches: Vec<LocalMatch>,
    pub web_results: Vec<WebResult>,
    pub context_text: String,
    pub confidence: f32,
    pub elapsed: Duration,
}

impl RetrievalOutcome {
    pub fn sources(&self) -> Vec<Citation> {
        let local = self.local_matches.iter().enumerate().map(|(i, m)| Citation {
            label: format!("Document {}", i + 1),
            title: m.document.title.clone(),
            locator: m.document.source_label.clone(),
        });
        let web = self.web_results.iter().enumerate().map(|(i, r)| Citation {
            label: format!("Web Result {}", i + 1),
            title: r.title.clone(),
            locator: r.url.clone(),
        });
        local.chain(web).collect()
    }
}
