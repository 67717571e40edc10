//! Output artifacts: per-category flashcard CSV files and the run manifest.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use quizcards_shared::{FlashcardRow, QuizcardsError, Result};

use crate::pipeline::{CategoryOutcome, CategoryStatus};

/// Current manifest schema version.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// File name of the run manifest inside the output directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// A file written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// File name of a category's flashcard table.
pub fn csv_file_name(category: &str) -> String {
    format!("flashcards_{category}.csv")
}

/// Write a category's cards as CSV.
///
/// The `Difficulty` column is present only when at least one card has one.
#[instrument(skip_all, fields(dir = %dir.display(), category, cards = cards.len()))]
pub fn write_category_csv(dir: &Path, category: &str, cards: &[FlashcardRow]) -> Result<ArtifactMeta> {
    let content = render_csv(cards);
    let meta = write_atomic(dir, &csv_file_name(category), &content)?;
    info!(file = %meta.filename, rows = cards.len(), "wrote flashcards");
    Ok(meta)
}

/// Render cards as CSV text with a header row.
pub fn render_csv(cards: &[FlashcardRow]) -> String {
    let with_difficulty = cards.iter().any(|card| card.difficulty.is_some());

    let mut header = vec!["Question", "Answer"];
    if with_difficulty {
        header.push("Difficulty");
    }
    header.extend(["category", "topic_name", "topic_number", "search_term"]);

    let mut out = String::new();
    push_record(&mut out, header.into_iter().map(str::to_string));

    for card in cards {
        let mut record = vec![card.question.clone(), card.answer.clone()];
        if with_difficulty {
            record.push(card.difficulty.map(|d| d.to_string()).unwrap_or_default());
        }
        record.extend([
            card.provenance.category.clone(),
            card.provenance.topic_label.clone(),
            card.provenance.topic_index.to_string(),
            card.provenance.search_term.clone(),
        ]);
        push_record(&mut out, record.into_iter());
    }

    out
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>) {
    let fields: Vec<String> = fields.map(|f| escape_field(&f)).collect();
    out.push_str(&fields.join(","));
    out.push('\n');
}

/// Quote a field when it contains a delimiter, quote, or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write `content` to `dir/filename` via a temp file and rename.
fn write_atomic(dir: &Path, filename: &str, content: &str) -> Result<ArtifactMeta> {
    std::fs::create_dir_all(dir).map_err(|e| QuizcardsError::io(dir, e))?;

    let target = dir.join(filename);
    let temp = dir.join(format!(".{filename}.tmp"));

    std::fs::write(&temp, content).map_err(|e| QuizcardsError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| QuizcardsError::io(&target, e))?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    debug!(file = %filename, size = content.len(), "wrote artifact");

    Ok(ArtifactMeta {
        filename: filename.to_string(),
        sha256: hash,
        size_bytes: content.len(),
    })
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Per-category entry in the run manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    /// `generated`, `skipped` or `failed`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub topics_total: usize,
    pub topics_failed: usize,
    pub cards: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactMeta>,
}

impl From<&CategoryOutcome> for CategorySummary {
    fn from(outcome: &CategoryOutcome) -> Self {
        let (status, reason) = match &outcome.status {
            CategoryStatus::Generated => ("generated", None),
            CategoryStatus::Skipped { reason } => ("skipped", Some(reason.clone())),
            CategoryStatus::Failed { reason } => ("failed", Some(reason.clone())),
        };
        Self {
            category: outcome.category.clone(),
            status: status.to_string(),
            reason,
            topics_total: outcome.topics_total,
            topics_failed: outcome.topics_failed,
            cards: outcome.cards.len(),
            artifact: outcome.artifact.clone(),
        }
    }
}

/// Record of one generation run, written next to the CSV files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub tool_version: String,
    pub model: String,
    pub prompt: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub categories: Vec<CategorySummary>,
}

impl RunManifest {
    /// Start a manifest for a run beginning now.
    pub fn new(tool_version: &str, model: &str, prompt: &str) -> Self {
        let now = Utc::now();
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            run_id: uuid::Uuid::now_v7().to_string(),
            tool_version: tool_version.to_string(),
            model: model.to_string(),
            prompt: prompt.to_string(),
            started_at: now,
            finished_at: now,
            categories: Vec::new(),
        }
    }

    /// Record the outcomes and stamp the finish time.
    pub fn finish(&mut self, outcomes: &[CategoryOutcome]) {
        self.categories = outcomes.iter().map(CategorySummary::from).collect();
        self.finished_at = Utc::now();
    }

    /// Write `manifest.json` into `dir`, returning its path.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            QuizcardsError::validation(format!("JSON serialization failed: {e}"))
        })?;
        write_atomic(dir, MANIFEST_FILE_NAME, &json)?;
        Ok(dir.join(MANIFEST_FILE_NAME))
    }
}
