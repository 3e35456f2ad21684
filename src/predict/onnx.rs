// Local ONNX sequence-classification predictor.
//
// Runs a Hugging Face style classifier exported to ONNX (input_ids +
// attention_mask in, logits out) entirely on the local CPU. A single logit
// column is read as a binary score via sigmoid; several columns go through
// softmax and the last column's probability is returned, which is the
// positive class for the usual negative/positive sentiment heads.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

use super::download::TOKENIZER_FILE;
use super::traits::Predictor;

pub struct OnnxPredictor {
    // ort::Session::run takes &mut self and spawn_blocking needs 'static
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxPredictor {
    /// Load the model at `model_path` and `tokenizer.json` from the same
    /// directory.
    pub fn load(model_path: &Path) -> Result<Self> {
        let tokenizer_path = model_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\nRun `quill download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Tokenizer file not found: {}\nRun `quill download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        debug!("Loaded ONNX predict model from {}", model_path.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl Predictor for OnnxPredictor {
    async fn predict(&self, text: &str) -> Result<f64> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

            let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            let attention_mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect();
            let shape = [1i64, input_ids.len() as i64];

            let input_ids_tensor = Tensor::from_array((shape, input_ids))
                .context("Failed to create input_ids tensor")?;
            let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
                .context("Failed to create attention_mask tensor")?;

            let logits = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = session
                    .run(ort::inputs! {
                        "input_ids" => input_ids_tensor,
                        "attention_mask" => attention_mask_tensor
                    })
                    .context("ONNX inference failed")?;

                // [1, num_labels] raw logits
                let (_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;
                data.iter().map(|&x| f64::from(x)).collect::<Vec<f64>>()
            };

            let score = score_from_logits(&logits)?;
            debug!(
                score,
                text_preview = %crate::output::truncate_chars(&text, 50),
                "ONNX predicted text"
            );
            Ok(score)
        })
        .await
        .context("spawn_blocking panicked")?
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Maps any real number to (0, 1).
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

fn score_from_logits(logits: &[f64]) -> Result<f64> {
    match logits {
        [] => anyhow::bail!("model produced no logits"),
        [single] => Ok(sigmoid(*single)),
        _ => softmax(logits)
            .last()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("model produced no logits")),
    }
}
