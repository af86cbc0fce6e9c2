use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use intellisearch_core::traits::{EmbeddingProvider, IndexWriter};
use intellisearch_core::{Document, EmbeddedDocument, Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub indexed: usize,
    pub skipped: Vec<String>,
    pub dim: usize,
    pub elapsed: Duration,
}

/// Embeds a corpus in batches and publishes it through an [`IndexWriter`].
///
/// Documents with blank content are skipped and reported by id.
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    show_progress: bool,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, batch_size: 32, show_progress: false }
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }

    pub fn show_progress(mut self, yes: bool) -> Self {
        self.show_progress = yes;
        self
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} docs ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }

    pub async fn build(&self, documents: Vec<Document>, writer: &dyn IndexWriter) -> Result<BuildReport> {
        let started = Instant::now();
        let (documents, skipped): (Vec<Document>, Vec<Document>) =
            documents.into_iter().partition(Document::is_embeddable);
        let skipped: Vec<String> = skipped.into_iter().map(|d| d.id).collect();
        if !skipped.is_empty() {
            tracing::warn!(count = skipped.len(), ids = ?skipped, "skipping documents with empty content");
        }

        let pb = self.progress_bar(documents.len());
        let mut embedded = Vec::with_capacity(documents.len());
        for chunk in documents.chunks(self.batch_size) {
            let texts: Vec<String> = chunk.iter().map(Document::embedding_text).collect();
            let embedder = Arc::clone(&self.embedder);
            let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
                .await
                .map_err(|e| Error::Operation(format!("embedding task failed: {e}")))??;
            for (doc, vector) in chunk.iter().cloned().zip(vectors) {
                embedded.push(EmbeddedDocument::new(doc, vector)?);
            }
            pb.inc(chunk.len() as u64);
        }
        pb.finish_with_message("embedded");

        let indexed = embedded.len();
        writer.replace_all(embedded).await?;
        let report = BuildReport { indexed, skipped, dim: self.embedder.dim(), elapsed: started.elapsed() };
        tracing::info!(
            indexed = report.indexed,
            skipped = report.skipped.len(),
            dim = report.dim,
            ms = report.elapsed.as_millis(),
            "index build finished"
        );
        Ok(report)
    }
}
