//! Inference engine boundary
//!
//! The service treats the neural inference stack as a collaborator behind a
//! small set of traits: an [`InferenceEngine`] that materializes artifacts on
//! disk and loads them, and the per-model [`Seq2SeqModel`]/[`TextTokenizer`]
//! pair bundled into a [`ModelHandle`]. The production implementation lives
//! in [`marian`]; tests substitute stubs.

pub mod beam;
pub mod marian;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

/// Marian reserved padding token id, suppressed during generation so beam
/// search never emits it mid-sequence.
pub const MARIAN_PAD_TOKEN_ID: u32 = 59513;

/// Fixed decoding parameters for sequence generation.
#[derive(Debug, Clone)]
pub struct DecodingConfig {
    /// Maximum number of generated tokens.
    pub max_length: usize,
    /// Beam width for beam search.
    pub num_beams: usize,
    /// Token ids that must never be generated.
    pub suppressed_tokens: Vec<u32>,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            max_length: 512,
            num_beams: 4,
            suppressed_tokens: vec![MARIAN_PAD_TOKEN_ID],
        }
    }
}

/// Text tokenizer for a loaded model.
pub trait TextTokenizer: Send + Sync {
    /// Encode text to token IDs, truncating to `max_length`.
    fn encode(&self, text: &str, max_length: usize) -> Result<Vec<u32>>;

    /// Decode token IDs back to text.
    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String>;
}

/// Sequence-to-sequence generation over a loaded model.
pub trait Seq2SeqModel: Send + Sync {
    /// Generate output token ids for the given input ids.
    fn generate(&self, input_ids: &[u32], config: &DecodingConfig) -> Result<Vec<u32>>;
}

/// Loaded, ready-to-use (model, tokenizer) pair.
///
/// Handles are created by the engine, owned by the model store and never
/// mutated afterwards. Cloning is cheap and preserves identity: clones share
/// the underlying model, observable via [`ModelHandle::same_model`].
#[derive(Clone)]
pub struct ModelHandle {
    /// The generation model.
    pub model: Arc<dyn Seq2SeqModel>,
    /// The matching tokenizer.
    pub tokenizer: Arc<dyn TextTokenizer>,
}

impl ModelHandle {
    /// Bundle a model and its tokenizer into a handle.
    pub fn new(model: Arc<dyn Seq2SeqModel>, tokenizer: Arc<dyn TextTokenizer>) -> Self {
        Self { model, tokenizer }
    }

    /// Whether two handles share the same underlying loaded model.
    pub fn same_model(&self, other: &ModelHandle) -> bool {
        Arc::ptr_eq(&self.model, &other.model)
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle").finish_non_exhaustive()
    }
}

/// Engine that materializes pretrained models locally and loads them.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Download the model and tokenizer artifacts published under `name` into
    /// `dir`, so future loads for the same directory succeed offline.
    async fn fetch_pretrained(&self, name: &str, dir: &Path) -> Result<()>;

    /// Load a ready-to-use handle from a local artifact directory.
    fn load_local(&self, dir: &Path) -> Result<ModelHandle>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_decoding_config() {
        let config = DecodingConfig::default();
        assert_eq!(config.max_length, 512);
        assert_eq!(config.num_beams, 4);
        assert_eq!(config.suppressed_tokens, vec![MARIAN_PAD_TOKEN_ID]);
    }

    struct NoopModel;
    impl Seq2SeqModel for NoopModel {
        fn generate(&self, input_ids: &[u32], _config: &DecodingConfig) -> Result<Vec<u32>> {
            Ok(input_ids.to_vec())
        }
    }

    struct NoopTokenizer;
    impl TextTokenizer for NoopTokenizer {
        fn encode(&self, _text: &str, _max_length: usize) -> Result<Vec<u32>> {
            Ok(vec![1, 2, 3])
        }
        fn decode(&self, _ids: &[u32], _skip_special_tokens: bool) -> Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_handle_identity() {
        let a = ModelHandle::new(Arc::new(NoopModel), Arc::new(NoopTokenizer));
        let b = a.clone();
        let c = ModelHandle::new(Arc::new(NoopModel), Arc::new(NoopTokenizer));

        assert!(a.same_model(&b));
        assert!(!a.same_model(&c));
    }
}
