//! MarianMT ONNX engine
//!
//! Production [`InferenceEngine`] backed by ONNX Runtime. Artifacts follow the
//! layout of ONNX-exported MarianMT checkpoints on the Hugging Face hub: an
//! encoder and decoder graph plus the fast-tokenizer file and the model
//! config. Generation runs the encoder once, then re-invokes the decoder per
//! beam-search step.

use std::cmp::Ordering;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::beam::BeamSearchDecoder;
use super::{DecodingConfig, InferenceEngine, ModelHandle, Seq2SeqModel, TextTokenizer};

/// Artifact files that make up one translation model.
const MODEL_FILES: &[&str] = &[
    "config.json",
    "tokenizer.json",
    "encoder_model.onnx",
    "decoder_model.onnx",
];

const DEFAULT_HUB_BASE: &str = "https://huggingface.co";
const DOWNLOAD_TIMEOUT_SECS: u64 = 3600;

/// ONNX Runtime engine for MarianMT translation models.
pub struct MarianOnnxEngine {
    client: reqwest::Client,
    hub_base: String,
}

impl MarianOnnxEngine {
    /// Create an engine that fetches from the Hugging Face hub.
    pub fn new() -> Result<Self> {
        Self::with_hub_base(DEFAULT_HUB_BASE)
    }

    /// Create an engine against a custom hub base URL (used by tests).
    pub fn with_hub_base(hub_base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            hub_base: hub_base.into(),
        })
    }

    /// Stream one remote file to disk, via a `.partial` file renamed on
    /// completion so an interrupted download is never mistaken for a finished
    /// artifact.
    async fn download_file(&self, url: &str, dest: &Path) -> Result<()> {
        debug!("Downloading {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("download of {} failed: HTTP {}", url, response.status()));
        }

        let partial = partial_path(dest);
        let mut file = std::fs::File::create(&partial)
            .with_context(|| format!("failed to create {}", partial.display()))?;

        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("download of {} interrupted", url))?;
            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
        }
        file.flush()?;
        drop(file);

        std::fs::rename(&partial, dest)
            .with_context(|| format!("failed to finalize {}", dest.display()))?;

        debug!("Downloaded {} ({} bytes)", dest.display(), downloaded);
        Ok(())
    }
}

#[async_trait]
impl InferenceEngine for MarianOnnxEngine {
    async fn fetch_pretrained(&self, name: &str, dir: &Path) -> Result<()> {
        info!("📥 Fetching pretrained model {}", name);

        for file in MODEL_FILES {
            let url = format!("{}/{}/resolve/main/{}", self.hub_base, name, file);
            self.download_file(&url, &dir.join(file)).await?;
        }

        info!("✅ Fetched {} into {}", name, dir.display());
        Ok(())
    }

    fn load_local(&self, dir: &Path) -> Result<ModelHandle> {
        let config = MarianModelConfig::load(&dir.join("config.json"))?;

        let tokenizer_path = dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer {}: {}", tokenizer_path.display(), e))?;

        let encoder = load_session(&dir.join("encoder_model.onnx"))?;
        let decoder = load_session(&dir.join("decoder_model.onnx"))?;

        let model = MarianModel {
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
            config,
        };

        Ok(ModelHandle::new(
            Arc::new(model),
            Arc::new(MarianTokenizer { inner: tokenizer }),
        ))
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    dest.with_file_name(name)
}

fn load_session(path: &Path) -> Result<Session> {
    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .commit_from_file(path)
        .with_context(|| format!("failed to load ONNX graph {}", path.display()))
}

/// Subset of the Hugging Face model config the decoder loop needs.
#[derive(Debug, Clone, Deserialize)]
struct MarianModelConfig {
    #[serde(default = "default_decoder_start_token_id")]
    decoder_start_token_id: u32,
    #[serde(default)]
    eos_token_id: u32,
}

fn default_decoder_start_token_id() -> u32 {
    super::MARIAN_PAD_TOKEN_ID
}

impl MarianModelConfig {
    fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// Tokenizer wrapper bridging the `tokenizers` crate to [`TextTokenizer`].
struct MarianTokenizer {
    inner: Tokenizer,
}

impl TextTokenizer for MarianTokenizer {
    fn encode(&self, text: &str, max_length: usize) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| anyhow!("tokenization failed: {}", e))?;

        let mut ids = encoding.get_ids().to_vec();
        if ids.len() > max_length {
            ids.truncate(max_length);
        }
        Ok(ids)
    }

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String> {
        self.inner
            .decode(ids, skip_special_tokens)
            .map_err(|e| anyhow!("detokenization failed: {}", e))
    }
}

/// Encoder/decoder session pair for one language direction.
///
/// ONNX Runtime sessions require exclusive access while running, so each
/// session sits behind a mutex: concurrent translations against the same
/// handle serialize at the session boundary rather than racing it.
struct MarianModel {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    config: MarianModelConfig,
}

impl Seq2SeqModel for MarianModel {
    fn generate(&self, input_ids: &[u32], config: &DecodingConfig) -> Result<Vec<u32>> {
        if input_ids.is_empty() {
            return Err(anyhow!("cannot generate from empty input"));
        }

        let source_ids: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = vec![1; source_ids.len()];
        let source_shape = vec![1_i64, source_ids.len() as i64];

        // Encoder runs once; its hidden states feed every decoder step.
        let (hidden_shape, hidden_states) = {
            let mut encoder = self
                .encoder
                .lock()
                .map_err(|_| anyhow!("encoder session lock poisoned"))?;

            let outputs = encoder.run(ort::inputs![
                "input_ids" => Tensor::from_array((source_shape.clone(), source_ids.clone()))?,
                "attention_mask" => Tensor::from_array((source_shape.clone(), attention_mask.clone()))?,
            ])?;

            let (shape, data) = outputs["last_hidden_state"].try_extract_tensor::<f32>()?;
            (shape.to_vec(), data.to_vec())
        };

        let decoder = BeamSearchDecoder::from_config(config, self.config.eos_token_id);

        decoder.decode(self.config.decoder_start_token_id, |hypotheses| {
            let mut session = self
                .decoder
                .lock()
                .map_err(|_| anyhow!("decoder session lock poisoned"))?;

            let mut rows = Vec::with_capacity(hypotheses.len());
            for hypothesis in hypotheses {
                let decoder_ids: Vec<i64> =
                    hypothesis.tokens.iter().map(|&id| id as i64).collect();
                let decoder_shape = vec![1_i64, decoder_ids.len() as i64];

                let outputs = session.run(ort::inputs![
                    "input_ids" => Tensor::from_array((decoder_shape, decoder_ids))?,
                    "encoder_attention_mask" => Tensor::from_array((source_shape.clone(), attention_mask.clone()))?,
                    "encoder_hidden_states" => Tensor::from_array((hidden_shape.clone(), hidden_states.clone()))?,
                ])?;

                let (logits_shape, logits) = outputs["logits"].try_extract_tensor::<f32>()?;
                let vocab_size = *logits_shape
                    .last()
                    .ok_or_else(|| anyhow!("decoder returned scalar logits"))?
                    as usize;
                if vocab_size == 0 || logits.len() < vocab_size {
                    return Err(anyhow!("decoder returned malformed logits"));
                }

                // Next-token distribution sits in the last position.
                let last = &logits[logits.len() - vocab_size..];
                rows.push(top_log_probs(last, config.num_beams));
            }
            Ok(rows)
        })
    }
}

/// Log-softmax the logits and keep the `k` most likely candidates.
fn top_log_probs(logits: &[f32], k: usize) -> Vec<(u32, f32)> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let log_z = logits.iter().map(|l| (l - max).exp()).sum::<f32>().ln() + max;

    let mut scored: Vec<(u32, f32)> = logits
        .iter()
        .enumerate()
        .map(|(id, &logit)| (id as u32, logit - log_z))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_log_probs_ranks_and_normalizes() {
        let logits = vec![0.0, 2.0, 1.0, -1.0];
        let top = top_log_probs(&logits, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, 1);
        assert_eq!(top[1].0, 2);
        // Log probabilities are negative after normalization.
        assert!(top[0].1 < 0.0);
        assert!(top[0].1 > top[1].1);
    }

    #[test]
    fn test_config_defaults_for_sparse_json() {
        let config: MarianModelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.decoder_start_token_id, super::super::MARIAN_PAD_TOKEN_ID);
        assert_eq!(config.eos_token_id, 0);
    }

    #[test]
    fn test_config_reads_token_ids() {
        let config: MarianModelConfig = serde_json::from_str(
            r#"{"decoder_start_token_id": 59513, "eos_token_id": 0, "model_type": "marian"}"#,
        )
        .unwrap();
        assert_eq!(config.decoder_start_token_id, 59513);
        assert_eq!(config.eos_token_id, 0);
    }

    #[test]
    fn test_partial_path_suffix() {
        let dest = Path::new("/tmp/models/en-de/encoder_model.onnx");
        assert_eq!(
            partial_path(dest),
            Path::new("/tmp/models/en-de/encoder_model.onnx.partial")
        );
    }
}
