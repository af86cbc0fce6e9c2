//! Embedding providers: the BGE-M3 model on candle, a deterministic hashed
//! embedder for tests and offline runs, and a content-hash cache wrapper.

mod cache;
mod device;
mod hashed;
mod model;
mod pool;
mod tokenize;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use intellisearch_core::config::{expand_path, EmbeddingBackend, EmbeddingConfig};
use intellisearch_core::traits::EmbeddingProvider;
use intellisearch_core::EmbeddingError;

pub use cache::{CacheStats, CachedEmbedder};
pub use device::select_device;
pub use hashed::HashedEmbedder;
pub use model::BgeEmbedder;
pub use pool::masked_mean_l2;

/// Build the configured provider, wrapped in a [`CachedEmbedder`].
///
/// `APP_USE_FAKE_EMBEDDINGS=1` forces the hashed embedder regardless of the
/// configured backend. A missing BGE model surfaces as
/// [`EmbeddingError::Unavailable`].
pub fn load_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let backend = if use_fake { EmbeddingBackend::Hashed } else { config.backend };

    let provider: Arc<dyn EmbeddingProvider> = match backend {
        EmbeddingBackend::Hashed => {
            tracing::info!(dim = config.hashed_dim, "using hashed embeddings");
            Arc::new(CachedEmbedder::new(HashedEmbedder::new(config.hashed_dim), config.cache_capacity))
        }
        EmbeddingBackend::Bge => {
            let dir = resolve_model_dir(config.model_dir.as_deref())?;
            let model = BgeEmbedder::load(&dir, config.max_tokens)?;
            Arc::new(CachedEmbedder::new(model, config.cache_capacity))
        }
    };
    Ok(provider)
}

/// Locate the BGE-M3 directory: configured path, then `APP_MODEL_DIR`, then
/// `models/bge-m3` and `../models/bge-m3` relative to the working directory.
pub fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf, EmbeddingError> {
    let candidates = configured
        .map(expand_path)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(expand_path))
        .chain([PathBuf::from("models/bge-m3"), PathBuf::from("../models/bge-m3")]);
    for dir in candidates {
        if dir.exists() {
            tracing::debug!(dir = %dir.display(), "using model dir");
            return Ok(dir);
        }
    }
    Err(EmbeddingError::Unavailable(format!(
        "could not locate BGE-M3 model directory (looked at {})",
        configured.map_or_else(|| Path::new("models/bge-m3").display().to_string(), str::to_string)
    )))
}
