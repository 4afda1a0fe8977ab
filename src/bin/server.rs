//! Translation server binary

use std::sync::Arc;

use anyhow::Result;

use opus_translate::config::AppConfig;
use opus_translate::engine::marian::MarianOnnxEngine;
use opus_translate::logging::init_logging;
use opus_translate::models::{ModelResolver, ModelStore};
use opus_translate::registry::SupportedPairs;
use opus_translate::server::{serve, AppState};
use opus_translate::translator::Translator;
use opus_translate::warmup;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path =
        std::env::var("OPUS_TRANSLATE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load_or_default(&config_path)?;

    init_logging(&config.to_log_config())?;
    tracing::info!("Starting translation server");

    let engine = Arc::new(MarianOnnxEngine::new()?);
    let resolver = ModelResolver::new(config.models.storage_root.clone(), engine);
    let store = Arc::new(ModelStore::new(resolver));
    let translator = Arc::new(Translator::new(SupportedPairs::from_catalog(), store.clone()));

    let preload_pairs = config.preload_pairs()?;
    warmup::preload(&store, &preload_pairs).await;

    let state = Arc::new(AppState::new(translator));
    state.mark_ready();

    serve(config.bind_addr()?, state).await
}
