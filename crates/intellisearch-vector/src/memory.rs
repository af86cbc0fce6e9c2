use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;

use intellisearch_core::traits::{IndexWriter, VectorIndex};
use intellisearch_core::{Document, EmbeddedDocument, IndexError, SearchHit};

use crate::similarity::{l2_normalize, rank_hits, score};

#[derive(Default)]
struct Snapshot {
    dim: Option<usize>,
    documents: Vec<Document>,
    vectors: Vec<Vec<f32>>,
    positions: HashMap<String, usize>,
}

/// Exact cosine index held in memory.
///
/// Readers clone the current `Arc<Snapshot>` and never block a writer for
/// longer than the pointer swap; `replace_all` builds the next snapshot off to
/// the side and publishes it in one step.
pub struct MemoryVectorIndex {
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
    expected_dim: Option<usize>,
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self { current: RwLock::new(Arc::new(Snapshot::default())), writer: Mutex::new(()), expected_dim: None }
    }

    /// Index that only accepts vectors of `dim` components.
    pub fn with_dim(dim: usize) -> Self {
        Self { expected_dim: Some(dim), ..Self::new() }
    }

    pub fn dim(&self) -> Option<usize> {
        self.snapshot().dim.or(self.expected_dim)
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn build(&self, documents: Vec<EmbeddedDocument>) -> Result<Snapshot, IndexError> {
        let mut dim = self.expected_dim;
        let mut seen = HashSet::with_capacity(documents.len());
        let mut next = Snapshot::default();
        for (position, embedded) in documents.into_iter().enumerate() {
            if !embedded.document.is_embeddable() {
                return Err(IndexError::EmptyDocument(embedded.document.id));
            }
            match dim {
                Some(expected) if expected != embedded.dim() => {
                    return Err(IndexError::DimensionMismatch { expected, actual: embedded.dim() });
                }
                None => dim = Some(embedded.dim()),
                Some(_) => {}
            }
            if !seen.insert(embedded.document.id.clone()) {
                return Err(IndexError::DuplicateId(embedded.document.id));
            }
            next.positions.insert(embedded.document.id.clone(), position);
            next.vectors.push(l2_normalize(embedded.vector));
            next.documents.push(embedded.document);
        }
        next.dim = if next.documents.is_empty() { None } else { dim };
        Ok(next)
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn len(&self) -> Result<usize, IndexError> {
        Ok(self.snapshot().documents.len())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let snap = self.snapshot();
        let Some(dim) = snap.dim else {
            return Ok(Vec::new());
        };
        if vector.len() != dim {
            return Err(IndexError::DimensionMismatch { expected: dim, actual: vector.len() });
        }
        let query = l2_normalize(vector.to_vec());
        let hits = snap
            .documents
            .iter()
            .zip(&snap.vectors)
            .map(|(doc, v)| SearchHit { id: doc.id.clone(), score: score(&query, v) })
            .collect();
        Ok(rank_hits(hits, top_k))
    }

    async fn document(&self, id: &str) -> Result<Option<Document>, IndexError> {
        let snap = self.snapshot();
        Ok(snap.positions.get(id).map(|&i| snap.documents[i].clone()))
    }
}

#[async_trait]
impl IndexWriter for MemoryVectorIndex {
    async fn replace_all(&self, documents: Vec<EmbeddedDocument>) -> Result<(), IndexError> {
        let _guard = self.writer.lock().await;
        let next = self.build(documents)?;
        let count = next.documents.len();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        tracing::info!(documents = count, "in-memory index published");
        Ok(())
    }
}
