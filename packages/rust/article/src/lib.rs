//! "You Gotta Know" article parsing.
//!
//! This crate provides:
//! - [`article_path`] / [`list_categories`]: the category ↔ filename convention
//! - [`parse_article`]: title validation plus topic extraction
//! - [`layouts`]: the structural variants, tried in priority order

pub mod layouts;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use quizcards_shared::{QuizcardsError, Result, TopicEntry, normalize_text};

pub use layouts::{ArticleLayout, DefinitionLayout, LayoutRegistry, ListLayout};

/// Phrase every article title must start with (compared case-insensitively).
pub const TITLE_MARKER: &str = "you gotta know";

/// Extension of saved article documents.
pub const ARTICLE_EXTENSION: &str = ".html";

const FILENAME_PREFIX: &str = "https___www_naqt_com_you_gotta_know_";
const FILENAME_SUFFIX: &str = "_html.html";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A parsed article: its title and topics in document order.
#[derive(Debug, Clone)]
pub struct Article {
    /// Normalized title heading.
    pub title: String,
    /// Name of the layout that produced the topics (`list`, `definition`, or `none`).
    pub layout: String,
    /// Extracted topics.
    pub topics: Vec<TopicEntry>,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Map a category name (or a direct `.html` filename) to its document path.
///
/// `"Short Story Authors"` becomes
/// `<articles_dir>/https___www_naqt_com_you_gotta_know_short_story_authors_html.html`.
pub fn article_path(articles_dir: &Path, category: &str) -> PathBuf {
    if category.ends_with(ARTICLE_EXTENSION) {
        let direct = Path::new(category);
        if direct.is_absolute() || direct.components().count() > 1 {
            return direct.to_path_buf();
        }
        return articles_dir.join(category);
    }
    articles_dir.join(format!("{FILENAME_PREFIX}{}{FILENAME_SUFFIX}", category_key(category)))
}

/// Canonical key for a category argument: lower-cased with underscores, or
/// recovered from a saved-article filename.
pub fn category_key(category: &str) -> String {
    if category.ends_with(ARTICLE_EXTENSION) {
        let file_name = Path::new(category)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| category.to_string());
        if let Some(key) = category_from_filename(&file_name) {
            return key;
        }
        return file_name.trim_end_matches(ARTICLE_EXTENSION).to_string();
    }
    category.trim().to_lowercase().replace(' ', "_")
}

/// Recover a category from a filename following the saved-article convention.
fn category_from_filename(file_name: &str) -> Option<String> {
    static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^https___www_naqt_com_you_gotta_know_(.+)_html\.html$").expect("valid regex")
    });

    FILENAME_RE
        .captures(file_name)
        .map(|caps| caps[1].to_string())
}

/// List the categories available in `articles_dir`, sorted by name.
///
/// A missing directory yields an empty list.
pub fn list_categories(articles_dir: &Path) -> Result<Vec<String>> {
    if !articles_dir.is_dir() {
        debug!(dir = %articles_dir.display(), "articles directory not found");
        return Ok(Vec::new());
    }

    let entries =
        std::fs::read_dir(articles_dir).map_err(|e| QuizcardsError::io(articles_dir, e))?;

    let mut categories = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| QuizcardsError::io(articles_dir, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(category) = category_from_filename(&name) {
            categories.push(category);
        }
    }

    categories.sort();
    Ok(categories)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Read and parse an article document from disk.
pub fn parse_article_file(path: &Path) -> Result<Article> {
    let html = std::fs::read_to_string(path).map_err(|e| QuizcardsError::io(path, e))?;
    parse_article(&html)
}

/// Parse an article document into its topics.
///
/// Fails when the title heading is missing or ambiguous, or when a layout's
/// structural invariants are violated.
#[instrument(skip_all)]
pub fn parse_article(html: &str) -> Result<Article> {
    let doc = Html::parse_document(html);
    let title = find_title(&doc)?;

    let registry = LayoutRegistry::new();
    let (topics, layout) = registry.extract(&doc, &title)?;

    debug!(%title, layout, topics = topics.len(), "parsed article");

    Ok(Article {
        title,
        layout: layout.to_string(),
        topics,
    })
}

/// Locate the single `h1` whose text starts with [`TITLE_MARKER`].
fn find_title(doc: &Html) -> Result<String> {
    static H1_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("h1").expect("valid selector"));

    let mut titles = doc
        .select(&H1_SEL)
        .map(|h1| normalize_text(&h1.text().collect::<String>()))
        .filter(|text| text.to_lowercase().starts_with(TITLE_MARKER));

    match (titles.next(), titles.next()) {
        (Some(title), None) => Ok(title),
        (None, _) => Err(QuizcardsError::parse(format!(
            "no top-level heading starting with '{TITLE_MARKER}'"
        ))),
        (Some(_), Some(_)) => Err(QuizcardsError::parse(format!(
            "more than one top-level heading starting with '{TITLE_MARKER}'"
        ))),
    }
}
