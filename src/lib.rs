//! Opus Translate
//!
//! Self-hosted translation service backed by on-demand MarianMT models.
//! Models are fetched from the Hugging Face hub on first use of a language
//! pair, persisted to local storage, and kept resident in an in-memory store
//! for the lifetime of the process.

#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod registry;
pub mod server;
pub mod translator;
pub mod warmup;

pub use error::{Error, Result};
pub use registry::{LanguagePair, SupportedPairs};
pub use translator::Translator;
