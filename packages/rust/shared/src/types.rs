//! Core domain types shared across the quizcards pipeline.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TopicEntry
// ---------------------------------------------------------------------------

/// One labeled unit of study content extracted from an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEntry {
    /// Normalized text of the article's title heading.
    pub article_title: String,
    /// Normalized topic label (e.g. `Flannery O'Connor (1925-1964)`).
    pub topic_label: String,
    /// Key terms marked by the article's authors, in document order.
    pub key_terms: Vec<String>,
    /// Normalized serialized markup of the topic's container element.
    pub raw_markup: String,
    /// Normalized flattened text of the topic's container element.
    pub body_text: String,
}

// ---------------------------------------------------------------------------
// FlashcardRow
// ---------------------------------------------------------------------------

/// Where a flashcard came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Category argument the article was resolved from.
    pub category: String,
    /// Label of the source topic.
    pub topic_label: String,
    /// 1-based position of the topic within its article.
    pub topic_index: usize,
    /// Sanitized search term used for corpus retrieval.
    pub search_term: String,
}

/// A generated question/answer card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardRow {
    pub question: String,
    pub answer: String,
    /// Difficulty on a 1–5 scale, when the model supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,
    pub provenance: Provenance,
}
