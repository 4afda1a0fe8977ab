//! Translation orchestration
//!
//! Validates a request against the registry, obtains a model handle from the
//! store and runs generation with the fixed decoding configuration. Stateless
//! across calls: each translation is an independent transaction against the
//! shared store.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::engine::{DecodingConfig, ModelHandle};
use crate::error::{Error, Result};
use crate::models::ModelStore;
use crate::registry::{LanguagePair, SupportedPairs};

/// Maximum number of input tokens fed to the encoder; longer inputs are
/// truncated by the tokenizer.
const MAX_INPUT_TOKENS: usize = 512;

/// Orchestrates single translation requests against the shared model store.
pub struct Translator {
    pairs: SupportedPairs,
    store: Arc<ModelStore>,
    decoding: DecodingConfig,
}

impl Translator {
    /// Create an orchestrator over the given registry and store.
    pub fn new(pairs: SupportedPairs, store: Arc<ModelStore>) -> Self {
        Self {
            pairs,
            store,
            decoding: DecodingConfig::default(),
        }
    }

    /// Translate `text` from `source_lang` to `target_lang`.
    ///
    /// Validation happens before the store is touched: a self-identical pair
    /// is an [`Error::InvalidRequest`], a pair outside the registry is an
    /// [`Error::UnsupportedPair`]. Registry membership, not cache presence,
    /// gates acceptance. Resolution failures surface as
    /// [`Error::ModelUnavailable`]; anything that fails after a handle was
    /// obtained becomes [`Error::TranslationFailed`]. No partial output is
    /// ever returned.
    pub async fn translate(
        &self,
        source_lang: &str,
        target_lang: &str,
        text: &str,
    ) -> Result<String> {
        if source_lang == target_lang {
            return Err(Error::InvalidRequest(
                "source and target languages must be different".to_string(),
            ));
        }

        let pair = LanguagePair::new(source_lang, target_lang);
        if !self.pairs.contains(&pair) {
            return Err(Error::UnsupportedPair(pair));
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidRequest("text must not be empty".to_string()));
        }

        let handle = self.store.get_or_load(&pair).await?;

        let start = Instant::now();
        let translated = self
            .run_generation(&handle, trimmed)
            .map_err(Error::TranslationFailed)?;

        info!(
            "Translated {} chars {} in {:.2}ms",
            trimmed.len(),
            pair,
            start.elapsed().as_secs_f32() * 1000.0
        );

        Ok(translated)
    }

    fn run_generation(&self, handle: &ModelHandle, text: &str) -> anyhow::Result<String> {
        let input_ids = handle.tokenizer.encode(text, MAX_INPUT_TOKENS)?;
        debug!("Encoded input to {} tokens", input_ids.len());

        let output_ids = handle.model.generate(&input_ids, &self.decoding)?;
        handle.tokenizer.decode(&output_ids, true)
    }

    /// The registry of supported pairs, for the serving layer.
    pub fn supported_pairs(&self) -> &SupportedPairs {
        &self.pairs
    }
}
