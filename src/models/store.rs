//! In-memory model handle cache
//!
//! Single authoritative location for loaded models. One process-wide lock
//! serializes every "is this pair loaded, and if not, load it" decision: the
//! lock is held across the whole resolve-and-insert sequence, so at most one
//! load is in flight system-wide at any instant. Loading pair A therefore
//! blocks a lookup for already-cached pair B for the duration of A's load.
//! Once a handle is out of the store the lock is released and any number of
//! translations may run against it concurrently.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::info;

use crate::engine::ModelHandle;
use crate::error::Result;
use crate::models::ModelResolver;
use crate::registry::LanguagePair;

/// Mapping from language pair to loaded model handle.
///
/// Entries are created lazily on first demand and never evicted: the store
/// only grows, bounded in practice by the fixed catalog of supported pairs.
/// Constructed once at startup and shared by reference; never ambient global
/// state.
pub struct ModelStore {
    resolver: ModelResolver,
    handles: Mutex<HashMap<LanguagePair, ModelHandle>>,
}

impl ModelStore {
    /// Create an empty store backed by `resolver`.
    pub fn new(resolver: ModelResolver) -> Self {
        Self {
            resolver,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Return the handle for `pair`, resolving and caching it on first use.
    ///
    /// On resolution failure the store is left unchanged: no partial or
    /// poisoned entry is inserted, so a later call retries from scratch.
    pub async fn get_or_load(&self, pair: &LanguagePair) -> Result<ModelHandle> {
        let mut handles = self.handles.lock().await;

        if let Some(handle) = handles.get(pair) {
            return Ok(handle.clone());
        }

        info!("Loading model for {}", pair);
        let handle = self.resolver.resolve(pair).await?;
        handles.insert(pair.clone(), handle.clone());

        Ok(handle)
    }

    /// Whether a handle for `pair` is currently resident.
    pub async fn contains(&self, pair: &LanguagePair) -> bool {
        self.handles.lock().await.contains_key(pair)
    }

    /// Number of resident handles.
    pub async fn len(&self) -> usize {
        self.handles.lock().await.len()
    }

    /// Whether no handle is resident yet.
    pub async fn is_empty(&self) -> bool {
        self.handles.lock().await.is_empty()
    }
}
