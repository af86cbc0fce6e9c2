//! Context window rendering.
//!
//! The layout is fixed: question, local documents, web results (only when
//! present), then answering instructions. Item order mirrors input order.

use serde::{Deserialize, Serialize};

use intellisearch_core::{LocalMatch, WebResult};

const HEAVY_RULE: usize = 50;
const LIGHT_RULE: usize = 40;
const ELLIPSIS: &str = "...";

/// Per-item preview budgets, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLimits {
    pub local_preview_chars: usize,
    pub web_preview_chars: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self { local_preview_chars: 800, web_preview_chars: 1000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSize {
    pub chars: usize,
    /// Rough budget estimate at four characters per token.
    pub approx_tokens: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ContextComposer {
    limits: ContextLimits,
}

impl ContextComposer {
    pub fn new(limits: ContextLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ContextLimits {
        self.limits
    }

    pub fn compose(&self, query: &str, local_matches: &[LocalMatch], web_results: &[WebResult]) -> String {
        let mut parts: Vec<String> = Vec::new();
        push_header(&mut parts, query);

        parts.push("RELEVANT DOCUMENTS FROM LOCAL DATABASE:".into());
        if local_matches.is_empty() {
            parts.push("No matching local documents.".into());
        }
        for (i, m) in local_matches.iter().enumerate() {
            let d = &m.document;
            parts.push(format!("\nDocument {}:", i + 1));
            parts.push(format!("Title: {}", d.title));
            parts.push(format!("Category: {}", d.category));
            parts.push(format!("Source: {}", d.source_label));
            parts.push(format!("Similarity Score: {:.3}", m.score));
            parts.push(format!("Content: {}", preview(&d.content, self.limits.local_preview_chars)));
            parts.push("-".repeat(LIGHT_RULE));
        }

        if !web_results.is_empty() {
            parts.push("\nADDITIONAL INFORMATION FROM WEB SEARCH:".into());
            for (i, r) in web_results.iter().enumerate() {
                parts.push(format!("\nWeb Result {}:", i + 1));
                parts.push(format!("Title: {}", r.title));
                parts.push(format!("URL: {}", r.url));
                parts.push(format!("Content: {}", preview(r.best_text(), self.limits.web_preview_chars)));
                parts.push("-".repeat(LIGHT_RULE));
            }
        }

        parts.push("\nINSTRUCTIONS:".into());
        parts.extend(
            [
                "- Answer the user's question using ONLY the information provided above",
                "- If the provided information is insufficient, clearly state what's missing",
                "- Cite your sources (Document 1, Document 2, Web Result 1, etc.)",
                "- Do NOT use any knowledge outside of the provided context",
                "- Be specific and accurate in your response",
            ]
            .map(String::from),
        );
        parts.join("\n")
    }

    /// Context for a query nothing was found for.
    pub fn compose_no_information(&self, query: &str) -> String {
        let mut parts = Vec::new();
        push_header(&mut parts, query);
        parts.push("No relevant information was found in the local knowledge base or on the web.".into());
        parts.push("\nINSTRUCTIONS:".into());
        parts.push("- Tell the user that no supporting information is available for this question".into());
        parts.push("- Suggest rephrasing the question or using more specific terms".into());
        parts.push("- Do NOT answer from outside knowledge".into());
        parts.join("\n")
    }

    pub fn measure(&self, text: &str) -> ContextSize {
        let chars = text.chars().count();
        ContextSize { chars, approx_tokens: chars.div_ceil(4) }
    }
}

fn push_header(parts: &mut Vec<String>, query: &str) {
    parts.push(format!("USER QUESTION: {query}"));
    parts.push(format!("\n{}\n", "=".repeat(HEAVY_RULE)));
}

/// First `cap` characters of `text`, with an ellipsis only when cut.
pub fn preview(text: &str, cap: usize) -> String {
    match text.char_indices().nth(cap) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}
