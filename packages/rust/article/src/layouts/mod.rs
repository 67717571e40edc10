//! Article layout trait and the built-in layouts.
//!
//! Saved "You Gotta Know" pages come in two structural variants: a `<ul>` of
//! labeled items and a `<dl>` of label/description pairs. Each is handled by
//! an [`ArticleLayout`]; the registry tries them in priority order.

mod definition;
mod list;

use quizcards_shared::{Result, TopicEntry, normalize_text};
use scraper::{ElementRef, Html};

pub use definition::DefinitionLayout;
pub use list::ListLayout;

/// Class marking an author-designated key term inside a topic.
pub(crate) const TERM_CLASS: &str = "ygk-term";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Trait for extracting topic entries from one structural variant.
pub trait ArticleLayout: Send + Sync {
    /// Extract every topic this layout recognizes, in document order.
    ///
    /// An empty result means the layout does not apply. An error means the
    /// layout applies but the document violates its structure.
    fn extract(&self, doc: &Html, article_title: &str) -> Result<Vec<TopicEntry>>;

    /// Human-readable layout name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered layouts in priority order.
pub struct LayoutRegistry {
    layouts: Vec<Box<dyn ArticleLayout>>,
}

impl LayoutRegistry {
    /// Create a registry with the list layout first and the definition layout second.
    pub fn new() -> Self {
        Self {
            layouts: vec![Box::new(ListLayout), Box::new(DefinitionLayout)],
        }
    }

    /// Run layouts in order and return the first non-empty extraction,
    /// together with the name of the layout that produced it.
    pub fn extract(&self, doc: &Html, article_title: &str) -> Result<(Vec<TopicEntry>, &str)> {
        for layout in &self.layouts {
            let entries = layout.extract(doc, article_title)?;
            if !entries.is_empty() {
                return Ok((entries, layout.name()));
            }
        }
        Ok((Vec::new(), "none"))
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by layouts
// ---------------------------------------------------------------------------

/// Direct-child `<span>` elements of `el` carrying `class`.
pub(crate) fn child_spans<'a>(
    el: ElementRef<'a>,
    class: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| {
            child.value().name() == "span" && child.value().classes().any(|c| c == class)
        })
}

/// Normalized flattened text content of an element.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<String>())
}

/// Build a topic entry from its label and the element holding its body.
pub(crate) fn topic_from_container(
    article_title: &str,
    label: String,
    container: ElementRef<'_>,
) -> TopicEntry {
    TopicEntry {
        article_title: article_title.to_string(),
        topic_label: label,
        key_terms: child_spans(container, TERM_CLASS)
            .map(element_text)
            .collect(),
        raw_markup: normalize_text(container.html().trim()),
        body_text: element_text(container),
    }
}
