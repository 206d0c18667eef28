// Sentence embeddings via a local all-MiniLM-L6-v2 ONNX model.
//
// Documents are tokenized, run through the transformer in fixed-size
// batches, mean-pooled over the attention mask, and L2-normalized. Unit
// vectors let the downstream clustering use Euclidean distance as a
// stand-in for cosine distance.
//
// The model runs locally — no API calls, no rate limits.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

/// Embedding dimension for all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// Documents per forward pass.
const BATCH_SIZE: usize = 32;

/// Turns documents into dense vectors. The embedding-cluster strategy goes
/// through this seam, so tests can supply deterministic vectors and the
/// backend can be swapped without touching the pipeline.
pub trait DocumentEmbedder {
    fn embed(&self, docs: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Local ONNX sentence embedder.
///
/// `Session::run` takes `&mut self`, hence the Mutex; inference is
/// CPU-bound and serialized anyway.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl OnnxEmbedder {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!("Embedding model not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Embedding tokenizer not found: {}",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}",
                    model_path.display()
                )
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load embedding tokenizer: {e}"))?;

        debug!(
            "Loaded sentence embedding model from {}",
            model_dir.display()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    /// Platform data directory where the model files are expected, e.g.
    /// `~/.local/share/strata/models/all-MiniLM-L6-v2` on Linux.
    pub fn default_model_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("strata")
            .join("models")
            .join("all-MiniLM-L6-v2")
    }

    fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings: Vec<_> = batch
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("Tokenization failed: {e}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        if max_len == 0 {
            return Ok(vec![vec![0.0; EMBEDDING_DIM]; batch_size]);
        }

        // BERT inputs, padded to the longest sequence in the batch:
        //   input_ids: token IDs (pad with 0)
        //   attention_mask: 1 for real tokens, 0 for padding
        //   token_type_ids: all zeros for single-sentence input
        let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut token_type_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let pad_len = max_len - ids.len();

            input_ids_flat.extend(ids.iter().map(|&id| i64::from(id)));
            input_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
            attention_mask_flat.extend(mask.iter().map(|&m| i64::from(m)));
            attention_mask_flat.extend(std::iter::repeat_n(0i64, pad_len));
            token_type_ids_flat.extend(std::iter::repeat_n(0i64, max_len));
        }

        let shape = [batch_size as i64, max_len as i64];

        let input_ids = Tensor::from_array((shape, input_ids_flat))
            .context("Failed to create input_ids tensor")?;
        let attention_mask = Tensor::from_array((shape, attention_mask_flat.clone()))
            .context("Failed to create attention_mask tensor")?;
        let token_type_ids = Tensor::from_array((shape, token_type_ids_flat))
            .context("Failed to create token_type_ids tensor")?;

        // Inference — output is last_hidden_state: [batch, seq_len, 384].
        let hidden = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| anyhow::anyhow!("Embedding session lock poisoned: {e}"))?;

            let outputs = session
                .run(ort::inputs! {
                    "input_ids" => input_ids,
                    "attention_mask" => attention_mask,
                    "token_type_ids" => token_type_ids
                })
                .context("Embedding inference failed")?;

            let (_shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .context("Failed to extract embedding output tensor")?;

            data.to_vec()
        };

        // Mean pooling weighted by the attention mask, then L2 normalize.
        let mut vectors = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let mut pooled = vec![0.0f32; EMBEDDING_DIM];
            let mut mask_total = 0.0f32;

            for j in 0..max_len {
                if attention_mask_flat[i * max_len + j] == 0 {
                    continue;
                }
                mask_total += 1.0;
                let offset = (i * max_len + j) * EMBEDDING_DIM;
                for (slot, value) in pooled.iter_mut().zip(&hidden[offset..offset + EMBEDDING_DIM])
                {
                    *slot += value;
                }
            }

            if mask_total > 0.0 {
                for value in &mut pooled {
                    *value /= mask_total;
                }
            }

            let norm = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for value in &mut pooled {
                    *value /= norm;
                }
            }

            vectors.push(pooled);
        }

        Ok(vectors)
    }
}

impl DocumentEmbedder for OnnxEmbedder {
    fn embed(&self, docs: &[String]) -> Result<Vec<Vec<f32>>> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(docs.len());
        for batch in docs.chunks(BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch)?);
        }

        debug!(
            documents = vectors.len(),
            dim = EMBEDDING_DIM,
            "Computed sentence embeddings"
        );

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_fails_without_model_files() {
        let result = OnnxEmbedder::load(Path::new("/nonexistent/model/dir"));
        assert!(result.is_err());
    }

    #[test]
    fn test_default_model_dir_ends_with_model_name() {
        let dir = OnnxEmbedder::default_model_dir();
        assert!(dir.ends_with("strata/models/all-MiniLM-L6-v2"));
    }
}
