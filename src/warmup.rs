//! Startup model warm-up
//!
//! Pre-populates the model store for a configured subset of pairs so the
//! first real requests skip the download. Strictly best-effort: every pair
//! can still be loaded lazily, so a failure here is logged and skipped and
//! never aborts startup.

use tracing::{error, info};

use crate::models::ModelStore;
use crate::registry::LanguagePair;

/// Resolve each configured pair into the store, one at a time.
pub async fn preload(store: &ModelStore, pairs: &[LanguagePair]) {
    if pairs.is_empty() {
        return;
    }

    info!("Warming up {} model(s)", pairs.len());

    for pair in pairs {
        match store.get_or_load(pair).await {
            Ok(_) => info!("Warmed up model for {}", pair),
            Err(e) => error!("Failed to pre-cache model {}: {:#}", pair, e),
        }
    }
}
