//! Shared types, error model, configuration and text normalization for quizcards.
//!
//! This crate is the foundation depended on by all other quizcards crates.
//! It provides:
//! - [`QuizcardsError`]: the unified error type
//! - Domain types ([`TopicEntry`], [`FlashcardRow`], [`Provenance`])
//! - Configuration ([`AppConfig`], [`DataPaths`], config loading)
//! - [`normalize_text`]: the scraped-text normalizer

pub mod config;
pub mod error;
pub mod text;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CacheConfig, DataConfig, DataPaths, GenerationConfig, OutputConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, term_cache_path,
    validate_api_key,
};
pub use error::{QuizcardsError, Result};
pub use text::normalize_text;
pub use types::{FlashcardRow, Provenance, TopicEntry};
