use std::hash::Hasher;

use twox_hash::XxHash64;

use intellisearch_core::traits::EmbeddingProvider;
use intellisearch_core::EmbeddingError;

/// Deterministic bag-of-words embedder based on feature hashing.
///
/// Tokens are lowercased alphanumeric runs; each token adds 1.0 to the bucket
/// picked by its xxHash64. The result is L2-normalised, so texts sharing
/// vocabulary score higher under cosine similarity. No model files needed,
/// which makes it the embedder of choice for tests and offline dev runs.
pub struct HashedEmbedder {
    dim: usize,
    model_id: String,
}

impl HashedEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, model_id: format!("hashed-bow:d{dim}") }
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(token.as_bytes());
        usize::try_from(hasher.finish() % self.dim as u64).unwrap_or(0)
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

impl EmbeddingProvider for HashedEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        let mut v = vec![0f32; self.dim];
        for token in tokens(text) {
            v[self.bucket(&token)] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }
}
