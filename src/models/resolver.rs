//! Local-or-remote model resolution
//!
//! Turns a language pair into a loaded model handle. The filesystem is
//! re-examined on every call, so artifacts removed (or repaired) behind the
//! service's back are observed on the next resolution for that pair.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::engine::{InferenceEngine, ModelHandle};
use crate::error::{Error, Result};
use crate::registry::LanguagePair;

/// Sentinel file written after a fetch fully persisted every artifact.
///
/// Its presence is what distinguishes a complete local copy from a directory
/// left behind by an interrupted download; a directory without it is treated
/// as a miss and re-fetched.
pub const COMPLETION_MARKER: &str = ".complete";

/// Naming convention for the remote model repository.
pub fn remote_model_name(pair: &LanguagePair) -> String {
    format!("Helsinki-NLP/opus-mt-{}", pair.key())
}

/// Resolves language pairs to loaded model handles, fetching and persisting
/// artifacts under the storage root on first use.
pub struct ModelResolver {
    storage_root: PathBuf,
    engine: Arc<dyn InferenceEngine>,
}

impl ModelResolver {
    /// Create a resolver over `storage_root`, delegating artifact handling to
    /// `engine`.
    pub fn new(storage_root: impl Into<PathBuf>, engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            storage_root: storage_root.into(),
            engine,
        }
    }

    /// Local artifact directory for a pair, e.g. `<root>/en-de/`.
    pub fn local_path(&self, pair: &LanguagePair) -> PathBuf {
        self.storage_root.join(pair.key())
    }

    /// Produce a ready handle for `pair`, downloading the model first if no
    /// complete local copy exists.
    pub async fn resolve(&self, pair: &LanguagePair) -> Result<ModelHandle> {
        let dir = self.local_path(pair);

        if !is_fully_persisted(&dir) {
            let name = remote_model_name(pair);
            info!("Downloading model {}...", name);

            self.fetch_and_persist(&name, &dir)
                .await
                .map_err(|source| Error::ModelUnavailable {
                    pair: pair.clone(),
                    source,
                })?;
        } else {
            info!("Loading model for {} from local cache...", pair);
        }

        self.engine
            .load_local(&dir)
            .map_err(|source| Error::ModelUnavailable {
                pair: pair.clone(),
                source,
            })
    }

    async fn fetch_and_persist(&self, name: &str, dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(dir)?;
        self.engine.fetch_pretrained(name, dir).await?;
        std::fs::write(dir.join(COMPLETION_MARKER), [])?;
        Ok(())
    }
}

/// A directory counts as a cache hit only when it is non-empty and carries the
/// completion marker.
fn is_fully_persisted(dir: &Path) -> bool {
    dir.join(COMPLETION_MARKER).is_file()
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::engine::tests_support::StubEngine;

    /// Engine whose fetch always fails after the directory exists.
    struct FailingFetchEngine {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl InferenceEngine for FailingFetchEngine {
        async fn fetch_pretrained(&self, _name: &str, _dir: &Path) -> anyhow::Result<()> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("remote repository unreachable"))
        }

        fn load_local(&self, _dir: &Path) -> anyhow::Result<ModelHandle> {
            Err(anyhow!("load_local must not be reached"))
        }
    }

    #[test]
    fn test_remote_model_name_convention() {
        let pair = LanguagePair::new("en", "de");
        assert_eq!(remote_model_name(&pair), "Helsinki-NLP/opus-mt-en-de");
    }

    #[test]
    fn test_local_path_is_keyed_by_pair() {
        let engine = Arc::new(StubEngine::new());
        let resolver = ModelResolver::new("/data/models", engine);
        assert_eq!(
            resolver.local_path(&LanguagePair::new("fr", "en")),
            Path::new("/data/models/fr-en")
        );
    }

    #[tokio::test]
    async fn test_miss_fetches_then_persists_marker() {
        let root = TempDir::new().unwrap();
        let engine = Arc::new(StubEngine::new());
        let resolver = ModelResolver::new(root.path(), engine.clone());
        let pair = LanguagePair::new("en", "de");

        resolver.resolve(&pair).await.unwrap();

        let dir = resolver.local_path(&pair);
        assert!(dir.join(COMPLETION_MARKER).is_file());
        assert_eq!(engine.fetch_count(), 1);
        assert_eq!(engine.load_count(), 1);
    }

    #[tokio::test]
    async fn test_complete_copy_skips_fetch() {
        let root = TempDir::new().unwrap();
        let engine = Arc::new(StubEngine::new());
        let resolver = ModelResolver::new(root.path(), engine.clone());
        let pair = LanguagePair::new("en", "de");

        resolver.resolve(&pair).await.unwrap();
        resolver.resolve(&pair).await.unwrap();

        // Second resolution must take the local branch.
        assert_eq!(engine.fetch_count(), 1);
        assert_eq!(engine.load_count(), 2);
    }

    #[tokio::test]
    async fn test_directory_without_marker_is_a_miss() {
        let root = TempDir::new().unwrap();
        let engine = Arc::new(StubEngine::new());
        let resolver = ModelResolver::new(root.path(), engine.clone());
        let pair = LanguagePair::new("en", "de");

        // Simulate an interrupted earlier fetch: files present, no marker.
        let dir = resolver.local_path(&pair);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("encoder_model.onnx"), b"truncated").unwrap();

        resolver.resolve(&pair).await.unwrap();
        assert_eq!(engine.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_maps_to_model_unavailable_and_stays_retryable() {
        let root = TempDir::new().unwrap();
        let engine = Arc::new(FailingFetchEngine {
            fetches: AtomicUsize::new(0),
        });
        let resolver = ModelResolver::new(root.path(), engine.clone());
        let pair = LanguagePair::new("en", "ja");

        let err = resolver.resolve(&pair).await.unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable { .. }));

        // The directory exists but carries no marker, so a retry fetches again
        // instead of mistaking the leftovers for a cache hit.
        let dir = resolver.local_path(&pair);
        assert!(dir.exists());
        assert!(!dir.join(COMPLETION_MARKER).exists());

        let _ = resolver.resolve(&pair).await.unwrap_err();
        assert_eq!(engine.fetches.load(Ordering::SeqCst), 2);
    }
}
