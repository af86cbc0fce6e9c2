//! Content-hash embedding cache on `moka`, bounded by entry count with
//! TinyLFU admission.

use std::sync::atomic::{AtomicU64, Ordering};

use moka::sync::Cache;

use intellisearch_core::traits::EmbeddingProvider;
use intellisearch_core::EmbeddingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

/// Memoises an inner provider.
///
/// Keys are `blake3(model_id || 0x00 || text)`. A zero capacity disables
/// caching.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: Option<Cache<blake3::Hash, Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<E: EmbeddingProvider> CachedEmbedder<E> {
    pub fn new(inner: E, capacity: usize) -> Self {
        let max = u64::try_from(capacity).unwrap_or(u64::MAX);
        let cache = (capacity > 0).then(|| Cache::builder().max_capacity(max).build());
        Self { inner, cache, hits: AtomicU64::new(0), misses: AtomicU64::new(0) }
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.cache.as_ref().map_or(0, |c| {
            c.run_pending_tasks();
            c.entry_count()
        });
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }

    fn key(&self, text: &str) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.inner.model_id().as_bytes());
        hasher.update(&[0]);
        hasher.update(text.as_bytes());
        hasher.finalize()
    }

    fn lookup(&self, key: &blake3::Hash) -> Option<Vec<f32>> {
        let found = self.cache.as_ref().and_then(|c| c.get(key));
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn store(&self, key: blake3::Hash, vector: &[f32]) {
        if let Some(cache) = &self.cache {
            cache.insert(key, vector.to_vec());
        }
    }
}

impl<E: EmbeddingProvider> EmbeddingProvider for CachedEmbedder<E> {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = self.key(text);
        if let Some(v) = self.lookup(&key) {
            return Ok(v);
        }
        let v = self.inner.embed(text)?;
        self.store(key, &v);
        Ok(v)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let keys: Vec<blake3::Hash> = texts.iter().map(|t| self.key(t)).collect();
        let mut out: Vec<Option<Vec<f32>>> = keys.iter().map(|k| self.lookup(k)).collect();

        let missing: Vec<usize> = (0..texts.len()).filter(|&i| out[i].is_none()).collect();
        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let fresh = self.inner.embed_batch(&batch)?;
            if fresh.len() != missing.len() {
                return Err(EmbeddingError::Failed(format!(
                    "batch returned {} vectors for {} texts",
                    fresh.len(),
                    missing.len()
                )));
            }
            for (i, v) in missing.into_iter().zip(fresh) {
                self.store(keys[i], &v);
                out[i] = Some(v);
            }
        }
        Ok(out.into_iter().flatten().collect())
    }
}
