//! Definition-list layout: `<dl class="ygk">` with positional `<dt>`/`<dd>` pairs.

use std::sync::LazyLock;

use quizcards_shared::{QuizcardsError, Result, TopicEntry};
use scraper::{Html, Selector};

use super::{ArticleLayout, element_text, topic_from_container};

static LABEL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dl.ygk > dt").expect("valid selector"));
static DESCRIPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dl.ygk > dd").expect("valid selector"));

/// Extracts topics from `<dl class="ygk"><dt>label</dt><dd>body</dd>…`.
pub struct DefinitionLayout;

impl ArticleLayout for DefinitionLayout {
    fn extract(&self, doc: &Html, article_title: &str) -> Result<Vec<TopicEntry>> {
        let labels: Vec<_> = doc.select(&LABEL_SEL).collect();
        let descriptions: Vec<_> = doc.select(&DESCRIPTION_SEL).collect();

        if labels.len() != descriptions.len() {
            return Err(QuizcardsError::parse(format!(
                "definition list has {} labels but {} descriptions",
                labels.len(),
                descriptions.len()
            )));
        }

        Ok(labels
            .into_iter()
            .zip(descriptions)
            .map(|(dt, dd)| topic_from_container(article_title, element_text(dt), dd))
            .collect())
    }

    fn name(&self) -> &str {
        "definition"
    }
}
