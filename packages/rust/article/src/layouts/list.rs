//! List layout: `<ul class="ygk">` whose items each hold a label span.

use std::sync::LazyLock;

use quizcards_shared::{QuizcardsError, Result, TopicEntry};
use scraper::{Html, Selector};

use super::{ArticleLayout, child_spans, element_text, topic_from_container};

static ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul.ygk > li").expect("valid selector"));

/// Extracts topics from `<ul class="ygk"><li><span class="label">…`.
pub struct ListLayout;

impl ArticleLayout for ListLayout {
    fn extract(&self, doc: &Html, article_title: &str) -> Result<Vec<TopicEntry>> {
        let mut entries = Vec::new();

        for (i, li) in doc.select(&ITEM_SEL).enumerate() {
            let mut labels = child_spans(li, "label");
            let label = match (labels.next(), labels.next()) {
                (Some(label), None) => element_text(label),
                (None, _) => {
                    return Err(QuizcardsError::parse(format!(
                        "list item {} has no label",
                        i + 1
                    )));
                }
                (Some(_), Some(_)) => {
                    return Err(QuizcardsError::parse(format!(
                        "list item {} has more than one label",
                        i + 1
                    )));
                }
            };

            entries.push(topic_from_container(article_title, label, li));
        }

        Ok(entries)
    }

    fn name(&self) -> &str {
        "list"
    }
}
