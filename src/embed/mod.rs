pub mod model;

use anyhow::{Context, Result};
use ort::value::Tensor;
use std::ops::Range;
use std::path::Path;

use crate::config::{EmbeddingConfig, Pooling};

/// Token overlap between windows when a text exceeds `max_tokens`
const WINDOW_OVERLAP: usize = 50;

/// Turns text into a fixed-length vector
pub trait EmbeddingProvider {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>>;

    /// Embeds a search query. Providers that use a retrieval instruction override this.
    fn embed_query(&mut self, query: &str) -> Result<Vec<f32>> {
        self.embed(query)
    }
}

/// Wrapper around ONNX Runtime for generating text embeddings
pub struct Embedder {
    session: ort::session::Session,
    tokenizer: tokenizers::Tokenizer,
    pooling: Pooling,
    max_tokens: usize,
    query_instruction: String,
    cls_id: u32,
    sep_id: u32,
}

impl Embedder {
    /// Creates a new embedder from model files in the given directory
    pub fn new(model_dir: &Path, config: &EmbeddingConfig) -> Result<Self> {
        validate_max_tokens(config.max_tokens)?;

        let model_path = model_dir.join(model::MODEL_FILE);
        let tokenizer_path = model_dir.join(model::TOKENIZER_FILE);

        let session = ort::session::Session::builder()
            .context("Failed to create ONNX session builder")?
            .with_intra_threads(1)
            .map_err(ort::Error::<()>::from)
            .context("Failed to set thread count")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {:?}", model_path))?;

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        // BERT vocab ids as fallback
        let cls_id = tokenizer.token_to_id("[CLS]").unwrap_or(101);
        let sep_id = tokenizer.token_to_id("[SEP]").unwrap_or(102);

        Ok(Self {
            session,
            tokenizer,
            pooling: config.pooling,
            max_tokens: config.max_tokens,
            query_instruction: config.query_instruction.clone(),
            cls_id,
            sep_id,
        })
    }

    /// Embeds a single token sequence using ort v2 Tensor API
    fn embed_tokens(&mut self, input_ids: &[u32], attention_mask: &[u32]) -> Result<Vec<f32>> {
        let seq_len = input_ids.len();

        let input_ids_i64: Vec<i64> = input_ids.iter().map(|&x| x as i64).collect();
        let attention_mask_i64: Vec<i64> = attention_mask.iter().map(|&x| x as i64).collect();
        let token_type_ids: Vec<i64> = vec![0i64; seq_len];

        let shape = vec![1i64, seq_len as i64];

        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids_i64))
            .context("Failed to create input_ids tensor")?;
        let attention_mask_tensor = Tensor::from_array((shape.clone(), attention_mask_i64))
            .context("Failed to create attention_mask tensor")?;
        let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids))
            .context("Failed to create token_type_ids tensor")?;

        let outputs = self
            .session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            })
            .context("ONNX inference failed")?;

        // last_hidden_state: [1, seq_len, dim]
        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract output tensor")?;

        if seq_len == 0 || data.len() % seq_len != 0 {
            anyhow::bail!(
                "Unexpected model output: {} values for {} tokens",
                data.len(),
                seq_len
            );
        }
        let dim = data.len() / seq_len;

        let pooled = match self.pooling {
            Pooling::Cls => cls_pool(data, dim),
            Pooling::Mean => {
                let mask_f32: Vec<f32> = attention_mask.iter().map(|&x| x as f32).collect();
                mean_pool_flat(data, &mask_f32, seq_len, dim)
            }
        };

        Ok(l2_normalize(&pooled))
    }

    /// Splits long text into overlapping windows and mean-pools the window embeddings
    fn embed_chunked(&mut self, text: &str) -> Result<Vec<f32>> {
        let chunk_size = self.max_tokens - 2; // room for [CLS] and [SEP]

        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let all_ids = encoding.get_ids();
        let mut embeddings: Vec<Vec<f32>> = Vec::new();

        for window in window_ranges(all_ids.len(), chunk_size, WINDOW_OVERLAP) {
            let mut padded_ids = vec![self.cls_id];
            padded_ids.extend_from_slice(&all_ids[window]);
            padded_ids.push(self.sep_id);

            let attention_mask: Vec<u32> = vec![1; padded_ids.len()];
            embeddings.push(self.embed_tokens(&padded_ids, &attention_mask)?);
        }

        log::debug!("Embedded {} tokens in {} windows", all_ids.len(), embeddings.len());

        let pooled = average(&embeddings).context("Text produced no tokens")?;
        Ok(l2_normalize(&pooled))
    }
}

impl EmbeddingProvider for Embedder {
    /// Generates an embedding for the given text.
    /// Texts longer than `max_tokens` are embedded in windows and mean-pooled.
    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            anyhow::bail!("Cannot embed empty text");
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        if encoding.get_ids().len() <= self.max_tokens {
            self.embed_tokens(encoding.get_ids(), encoding.get_attention_mask())
        } else {
            self.embed_chunked(text)
        }
    }

    fn embed_query(&mut self, query: &str) -> Result<Vec<f32>> {
        let text = query_text(&self.query_instruction, query);
        self.embed(&text)
    }
}

/// Windows need room for [CLS], [SEP] and the overlap
fn validate_max_tokens(max_tokens: usize) -> Result<()> {
    if max_tokens <= WINDOW_OVERLAP + 2 {
        anyhow::bail!(
            "max_tokens must be greater than {}, got {}",
            WINDOW_OVERLAP + 2,
            max_tokens
        );
    }
    Ok(())
}

/// Token ranges of `chunk`-sized windows covering `len` tokens,
/// each starting `overlap` tokens before the previous one ends
fn window_ranges(len: usize, chunk: usize, overlap: usize) -> Vec<Range<usize>> {
    let mut windows = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + chunk).min(len);
        windows.push(start..end);
        if end >= len {
            break;
        }
        start = end - overlap;
    }
    windows
}

/// Trimmed query with the retrieval instruction prepended.
/// A blank query stays blank so `embed` rejects it.
fn query_text(instruction: &str, query: &str) -> String {
    let query = query.trim();
    if instruction.is_empty() || query.is_empty() {
        return query.to_string();
    }
    format!("{}{}", instruction, query)
}

/// Takes the first token's hidden state from a flat [1, seq_len, dim] slice
fn cls_pool(data: &[f32], dim: usize) -> Vec<f32> {
    data[..dim].to_vec()
}

/// Mean pooling on a flat f32 slice with shape [1, seq_len, embedding_dim]
fn mean_pool_flat(data: &[f32], mask: &[f32], seq_len: usize, dim: usize) -> Vec<f32> {
    let mut result = vec![0.0f32; dim];
    let mut total_weight = 0.0f32;

    for (i, &w) in mask.iter().enumerate().take(seq_len) {
        total_weight += w;
        let offset = i * dim;
        for j in 0..dim {
            result[j] += data[offset + j] * w;
        }
    }

    if total_weight > 0.0 {
        for val in &mut result {
            *val /= total_weight;
        }
    }

    result
}

/// Element-wise mean of equally sized vectors
fn average(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let mut result = vec![0.0f32; first.len()];
    for v in vectors {
        for (acc, val) in result.iter_mut().zip(v.iter()) {
            *acc += val;
        }
    }
    let n = vectors.len() as f32;
    for val in &mut result {
        *val /= n;
    }
    Some(result)
}

/// L2 normalization
fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vec.iter().map(|x| x / norm).collect()
    } else {
        vec.to_vec()
    }
}
