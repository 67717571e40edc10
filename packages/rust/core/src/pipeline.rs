//! End-to-end generation: category → article → topics → prompts → flashcards.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{error, info, instrument, warn};

use quizcards_article::{article_path, category_key, parse_article_file};
use quizcards_corpus::Corpus;
use quizcards_markdown::{ParsedTable, parse_table};
use quizcards_shared::{FlashcardRow, Provenance, QuizcardsError, Result, TopicEntry};

use crate::generation::TextGenerator;
use crate::output::{ArtifactMeta, write_category_csv};
use crate::prompt::{ExcerptBundle, PromptTemplate, format_prompt};
use crate::sanitize::TermSanitizer;

// ---------------------------------------------------------------------------
// Config and outcomes
// ---------------------------------------------------------------------------

/// Configuration for [`run_generation`].
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Categories (or article filenames) to process, in order.
    pub categories: Vec<String>,
    /// Directory holding the saved article pages.
    pub articles_dir: PathBuf,
    /// Generation template applied to every topic.
    pub template: PromptTemplate,
    /// Model override passed to the generator.
    pub model: Option<String>,
    /// Where CSV files are written. `None` keeps cards in memory only.
    pub output_dir: Option<PathBuf>,
}

/// Whether a category produced output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryStatus {
    Generated,
    Skipped { reason: String },
    /// Cards were generated but their CSV could not be written.
    Failed { reason: String },
}

/// Result of processing one category.
#[derive(Debug, Clone)]
pub struct CategoryOutcome {
    pub category: String,
    pub status: CategoryStatus,
    pub topics_total: usize,
    pub topics_failed: usize,
    pub cards: Vec<FlashcardRow>,
    /// CSV written for this category, if any.
    pub artifact: Option<ArtifactMeta>,
}

impl CategoryOutcome {
    pub fn skipped(category: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            status: CategoryStatus::Skipped {
                reason: reason.into(),
            },
            topics_total: 0,
            topics_failed: 0,
            cards: Vec::new(),
            artifact: None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, CategoryStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, CategoryStatus::Failed { .. })
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting generation status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a category's article has been parsed.
    fn category_started(&self, category: &str, topics: usize);
    /// Called after each topic, successful or not.
    fn topic_finished(&self, category: &str, topic: &str, current: usize, total: usize);
    /// Called when a category is finished or skipped.
    fn category_finished(&self, outcome: &CategoryOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn category_started(&self, _category: &str, _topics: usize) {}
    fn topic_finished(&self, _category: &str, _topic: &str, _current: usize, _total: usize) {}
    fn category_finished(&self, _outcome: &CategoryOutcome) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Generate flashcards for every configured category, in order.
///
/// A category whose article is missing or malformed is skipped. A topic whose
/// generation fails is logged and counted; its siblings continue. A category
/// whose CSV cannot be written is marked failed and the run moves on.
#[instrument(skip_all, fields(categories = config.categories.len(), template = config.template.name()))]
pub async fn run_generation<G: TextGenerator>(
    config: &GenerateConfig,
    corpus: &Corpus,
    generator: &G,
    sanitizer: &mut TermSanitizer,
    progress: &dyn ProgressReporter,
) -> Result<Vec<CategoryOutcome>> {
    let start = Instant::now();
    let mut outcomes = Vec::with_capacity(config.categories.len());

    for category in &config.categories {
        let mut outcome = run_category(config, category, corpus, generator, sanitizer, progress).await;

        if let Some(dir) = &config.output_dir {
            if !outcome.cards.is_empty() {
                match write_category_csv(dir, &category_key(category), &outcome.cards) {
                    Ok(meta) => outcome.artifact = Some(meta),
                    Err(e) => {
                        error!(category = %category, error = %e, "failed to write flashcards");
                        outcome.status = CategoryStatus::Failed {
                            reason: e.to_string(),
                        };
                    }
                }
            }
        }

        progress.category_finished(&outcome);
        outcomes.push(outcome);
    }

    info!(
        categories = outcomes.len(),
        skipped = outcomes.iter().filter(|o| o.is_skipped()).count(),
        failed = outcomes.iter().filter(|o| o.is_failed()).count(),
        cards = outcomes.iter().map(|o| o.cards.len()).sum::<usize>(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "generation complete"
    );

    Ok(outcomes)
}

#[instrument(skip_all, fields(category = %category))]
async fn run_category<G: TextGenerator>(
    config: &GenerateConfig,
    category: &str,
    corpus: &Corpus,
    generator: &G,
    sanitizer: &mut TermSanitizer,
    progress: &dyn ProgressReporter,
) -> CategoryOutcome {
    let path = article_path(&config.articles_dir, category);
    if !path.is_file() {
        warn!(path = %path.display(), "article not found, skipping category");
        return CategoryOutcome::skipped(category, format!("article not found: {}", path.display()));
    }

    let article = match parse_article_file(&path) {
        Ok(article) => article,
        Err(e) => {
            warn!(error = %e, "article could not be parsed, skipping category");
            return CategoryOutcome::skipped(category, e.to_string());
        }
    };

    let total = article.topics.len();
    info!(title = %article.title, layout = %article.layout, topics = total, "processing article");
    progress.category_started(category, total);

    let mut cards = Vec::new();
    let mut failed = 0;

    for (i, topic) in article.topics.iter().enumerate() {
        let index = i + 1;
        match run_topic(config, category, index, topic, corpus, generator, sanitizer).await {
            Ok(topic_cards) => {
                info!(topic = %topic.topic_label, index, cards = topic_cards.len(), "topic done");
                cards.extend(topic_cards);
            }
            Err(e) => {
                warn!(topic = %topic.topic_label, index, error = %e, "topic failed");
                failed += 1;
            }
        }
        progress.topic_finished(category, &topic.topic_label, index, total);
    }

    CategoryOutcome {
        category: category.to_string(),
        status: CategoryStatus::Generated,
        topics_total: total,
        topics_failed: failed,
        cards,
        artifact: None,
    }
}

async fn run_topic<G: TextGenerator>(
    config: &GenerateConfig,
    category: &str,
    index: usize,
    topic: &TopicEntry,
    corpus: &Corpus,
    generator: &G,
    sanitizer: &mut TermSanitizer,
) -> Result<Vec<FlashcardRow>> {
    let search_term = sanitizer.sanitize(generator, &topic.topic_label).await?;
    if search_term.is_empty() {
        return Err(QuizcardsError::validation("topic has an empty label"));
    }

    let tossups = corpus.search_tossups(&search_term)?;
    let bonuses = corpus.search_bonuses(&search_term)?;
    let bundle = ExcerptBundle::from_matches(&tossups, &bonuses);

    let prompt = format_prompt(topic, config.template.text(), &bundle)?;
    let reply = generator.generate(&prompt, config.model.as_deref()).await?;
    let table = parse_table(&reply)?;

    let provenance = Provenance {
        category: category.to_string(),
        topic_label: topic.topic_label.clone(),
        topic_index: index,
        search_term,
    };
    cards_from_table(&table, &provenance)
}

/// Convert a parsed reply table into flashcards.
///
/// `Question` and `Answer` columns are required; `Difficulty` is optional and
/// non-numeric values become `None`.
pub fn cards_from_table(table: &ParsedTable, provenance: &Provenance) -> Result<Vec<FlashcardRow>> {
    let question = table
        .column_index("Question")
        .ok_or_else(|| QuizcardsError::parse("reply table has no Question column"))?;
    let answer = table
        .column_index("Answer")
        .ok_or_else(|| QuizcardsError::parse("reply table has no Answer column"))?;
    let difficulty = table.column_index("Difficulty");

    Ok(table
        .rows
        .iter()
        .map(|row| FlashcardRow {
            question: row[question].clone(),
            answer: row[answer].clone(),
            difficulty: difficulty.and_then(|d| row[d].parse::<u8>().ok()),
            provenance: provenance.clone(),
        })
        .collect())
}
