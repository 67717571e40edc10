//! Flashcard generation pipeline for quizcards.
//!
//! This crate ties together article parsing, corpus search, prompt
//! construction, text generation and table parsing into the end-to-end
//! [`pipeline::run_generation`] workflow, and writes the resulting artifacts.

pub mod generation;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod sanitize;

pub use generation::{ChatCompletionsClient, TextGenerator};
pub use output::{ArtifactMeta, CategorySummary, RunManifest, write_category_csv};
pub use pipeline::{
    CategoryOutcome, CategoryStatus, GenerateConfig, ProgressReporter, SilentProgress,
    cards_from_table, run_generation,
};
pub use prompt::{ExcerptBundle, PromptStyle, PromptTemplate, format_prompt};
pub use sanitize::{TermCache, TermSanitizer};
