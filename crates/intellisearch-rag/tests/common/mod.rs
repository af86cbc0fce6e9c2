#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use intellisearch_core::traits::{EmbeddingProvider, IndexWriter, VectorIndex};
use intellisearch_core::{Document, EmbeddedDocument, EmbeddingError, IndexError, SearchHit};
use intellisearch_vector::MemoryVectorIndex;

/// One dimension per topic; a component counts the topic's keyword
/// occurrences. Texts with no topic word embed to the zero vector.
pub struct TopicEmbedder {
    calls: AtomicUsize,
}

pub const TOPICS: [&str; 4] = ["mars", "black hole", "station", "telescope"];

impl TopicEmbedder {
    pub fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for TopicEmbedder {
    fn model_id(&self) -> &str {
        "topic-test"
    }

    fn dim(&self) -> usize {
        TOPICS.len()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lower = text.to_lowercase();
        Ok(TOPICS.iter().map(|t| lower.matches(t).count() as f32).collect())
    }
}

/// Returns the same vector for every text.
pub struct FixedEmbedder(pub Vec<f32>);

impl EmbeddingProvider for FixedEmbedder {
    fn model_id(&self) -> &str {
        "fixed-test"
    }
    fn dim(&self) -> usize {
        self.0.len()
    }
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.0.clone())
    }
}

pub struct BrokenEmbedder {
    pub unavailable: bool,
}

impl EmbeddingProvider for BrokenEmbedder {
    fn model_id(&self) -> &str {
        "broken-test"
    }
    fn dim(&self) -> usize {
        TOPICS.len()
    }
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.unavailable {
            Err(EmbeddingError::Unavailable("model files missing".into()))
        } else {
            Err(EmbeddingError::Failed("tensor shape mismatch".into()))
        }
    }
}

/// Index that reports a hit for an id it cannot resolve.
pub struct DanglingIndex;

#[async_trait]
impl VectorIndex for DanglingIndex {
    async fn len(&self) -> Result<usize, IndexError> {
        Ok(1)
    }
    async fn search(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<SearchHit>, IndexError> {
        Ok(vec![SearchHit { id: "ghost".into(), score: 0.9 }])
    }
    async fn document(&self, _id: &str) -> Result<Option<Document>, IndexError> {
        Ok(None)
    }
}

pub fn doc(id: &str, title: &str, category: &str, content: &str) -> Document {
    Document {
        id: id.into(),
        title: title.into(),
        content: content.into(),
        category: category.into(),
        keywords: Vec::new(),
        source_label: "Space Science Knowledge Base".into(),
    }
}

pub fn space_corpus() -> Vec<Document> {
    vec![
        doc(
            "mars",
            "Mars Exploration: The Quest for Life on the Red Planet",
            "planetary_science",
            "Mars exploration has been a major focus of space agencies. Rovers like Curiosity and \
             Perseverance study Mars geology and climate.",
        ),
        doc(
            "black-holes",
            "Black Holes: The Universe's Most Mysterious Objects",
            "astronomy",
            "A black hole is a region of spacetime where gravity is so strong that nothing escapes.",
        ),
        doc(
            "iss",
            "International Space Station: Humanity's Home in Space",
            "space_stations",
            "The station orbits Earth at about 400 kilometers and hosts microgravity experiments.",
        ),
        doc(
            "jwst",
            "James Webb Space Telescope",
            "space_technology",
            "The telescope observes in the infrared. The telescope mirror has 18 segments; it also imaged Mars.",
        ),
    ]
}

/// Memory index filled with `documents` embedded by `embedder`.
pub async fn index_with(embedder: &dyn EmbeddingProvider, documents: Vec<Document>) -> Arc<MemoryVectorIndex> {
    let index = Arc::new(MemoryVectorIndex::new());
    let embedded = documents
        .into_iter()
        .map(|d| {
            let v = embedder.embed(&d.embedding_text()).unwrap();
            EmbeddedDocument::new(d, v).unwrap()
        })
        .collect();
    index.replace_all(embedded).await.unwrap();
    index
}

/// Memory index with explicit vectors, inserted in order.
pub async fn index_of(entries: Vec<(&str, Vec<f32>)>) -> Arc<MemoryVectorIndex> {
    let index = Arc::new(MemoryVectorIndex::new());
    let embedded = entries
        .into_iter()
        .map(|(id, v)| EmbeddedDocument::new(doc(id, id, "test", "content"), v).unwrap())
        .collect();
    index.replace_all(embedded).await.unwrap();
    index
}
