use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use intellisearch_core::EmbeddingError;

/// XLM-RoBERTa `<pad>` id.
const PAD_ID: u32 = 1;

/// Tokenize a batch into `[B, max_len]` id and mask tensors, truncating and
/// right-padding every row to `max_len`.
pub fn tokenize_batch(
    tokenizer: &Tokenizer,
    texts: &[&str],
    max_len: usize,
    device: &Device,
) -> Result<(Tensor, Tensor), EmbeddingError> {
    let mut ids = Vec::with_capacity(texts.len() * max_len);
    let mut mask = Vec::with_capacity(texts.len() * max_len);
    for text in texts {
        let enc = tokenizer
            .encode(*text, true)
            .map_err(|e| EmbeddingError::Failed(format!("tokenization failed: {e}")))?;
        let (row_ids, row_mask) = pad_row(enc.get_ids(), enc.get_attention_mask(), max_len);
        ids.extend(row_ids);
        mask.extend(row_mask);
    }
    let shape = (texts.len(), max_len);
    let input_ids = Tensor::from_vec(ids, shape, device).map_err(failed)?;
    let attention_mask = Tensor::from_vec(mask, shape, device).map_err(failed)?;
    Ok((input_ids, attention_mask))
}

fn pad_row(ids: &[u32], mask: &[u32], max_len: usize) -> (Vec<u32>, Vec<u32>) {
    let take = ids.len().min(max_len);
    let mut row_ids = ids[..take].to_vec();
    let mut row_mask = mask[..take.min(mask.len())].to_vec();
    row_ids.resize(max_len, PAD_ID);
    row_mask.resize(max_len, 0);
    (row_ids, row_mask)
}

pub(crate) fn failed(e: candle_core::Error) -> EmbeddingError {
    EmbeddingError::Failed(e.to_string())
}
