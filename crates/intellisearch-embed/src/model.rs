use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use intellisearch_core::traits::EmbeddingProvider;
use intellisearch_core::EmbeddingError;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::{failed, tokenize_batch};

/// BGE-M3 dense embedder running XLM-RoBERTa on candle.
///
/// Expects `tokenizer.json`, `config.json` and `pytorch_model.bin` in the
/// model directory. The output dimension is the model's `hidden_size`.
pub struct BgeEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    max_tokens: usize,
    dim: usize,
    model_id: String,
}

impl BgeEmbedder {
    pub fn load(model_dir: &Path, max_tokens: usize) -> Result<Self, EmbeddingError> {
        let started = Instant::now();
        let device = select_device();
        let unavailable =
            |what: &str, e: &dyn std::fmt::Display| EmbeddingError::Unavailable(format!("{what}: {e}"));

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| unavailable(&tokenizer_path.display().to_string(), &e))?;

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| unavailable(&config_path.display().to_string(), &e))?;
        let config: XLMRobertaConfig =
            serde_json::from_str(&raw).map_err(|e| unavailable("config.json", &e))?;
        let dim = hidden_size(&raw)?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(&weights_path)
            .map_err(|e| unavailable(&weights_path.display().to_string(), &e))?
            .into_iter()
            .collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).map_err(|e| unavailable("model init", &e))?;

        tracing::info!(
            dir = %model_dir.display(),
            dim,
            ms = started.elapsed().as_millis(),
            "BGE-M3 model loaded"
        );
        Ok(Self {
            model,
            tokenizer,
            device,
            max_tokens: max_tokens.max(8),
            dim,
            model_id: format!("bge-m3:d{dim}"),
        })
    }

    fn forward(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_tokens, &self.device)?;
        let token_type_ids = input_ids.zeros_like().map_err(failed)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)
            .map_err(failed)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask).map_err(failed)?;
        let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu).and_then(|t| t.to_vec2()).map_err(failed)?;
        if let Some(row) = rows.iter().find(|r| r.len() != self.dim) {
            return Err(EmbeddingError::Failed(format!(
                "model produced {} dims, expected {}",
                row.len(),
                self.dim
            )));
        }
        Ok(rows)
    }
}

impl EmbeddingProvider for BgeEmbedder {
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
        let started = Instant::now();
        let mut rows = self.forward(&[text])?;
        if started.elapsed().as_millis() > 100 {
            tracing::debug!(ms = started.elapsed().as_millis(), "slow embedding");
        }
        rows.pop().ok_or_else(|| EmbeddingError::Failed("empty model output".into()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::EmptyInput);
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.forward(&refs)
    }
}

fn hidden_size(raw_config: &str) -> Result<usize, EmbeddingError> {
    let value: serde_json::Value = serde_json::from_str(raw_config)
        .map_err(|e| EmbeddingError::Unavailable(format!("config.json: {e}")))?;
    value
        .get("hidden_size")
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| EmbeddingError::Unavailable("config.json has no hidden_size".into()))
}
