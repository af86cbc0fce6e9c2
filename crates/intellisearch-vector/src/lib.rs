//! Vector index implementations behind the `VectorIndex`/`IndexWriter`
//! traits, plus the corpus-to-index builder.

mod builder;
mod lance;
mod memory;
mod schema;
mod similarity;
pub mod table;

use std::sync::Arc;

use intellisearch_core::config::{expand_path, IndexBackend, IndexConfig};
use intellisearch_core::traits::{IndexWriter, VectorIndex};
use intellisearch_core::IndexError;

pub use builder::{BuildReport, IndexBuilder};
pub use lance::LanceVectorIndex;
pub use memory::MemoryVectorIndex;
pub use schema::{build_documents_schema, build_meta_schema};

/// Read and write handles onto the same index.
#[derive(Clone)]
pub struct IndexHandle {
    pub reader: Arc<dyn VectorIndex>,
    pub writer: Arc<dyn IndexWriter>,
}

impl IndexHandle {
    pub fn new<I>(index: Arc<I>) -> Self
    where
        I: VectorIndex + IndexWriter + 'static,
    {
        Self { reader: index.clone(), writer: index }
    }
}

/// Open the configured backend. The memory backend starts empty.
pub async fn open_index(config: &IndexConfig) -> Result<IndexHandle, IndexError> {
    match config.backend {
        IndexBackend::Memory => Ok(IndexHandle::new(Arc::new(MemoryVectorIndex::new()))),
        IndexBackend::Lance => {
            let dir = expand_path(&config.lancedb_dir);
            if let Some(parent) = dir.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| IndexError::Unavailable(format!("{}: {e}", parent.display())))?;
            }
            let index = LanceVectorIndex::open(&dir.to_string_lossy(), &config.table).await?;
            Ok(IndexHandle::new(Arc::new(index)))
        }
    }
}
